//! Overlay configuration
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides.

use crate::error::{MarkupError, MarkupResult};
use crate::stroke::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Local storage key holding the serialized store
    pub storage_key: String,

    /// Reserved URL fragment key carrying a shared store
    pub fragment_key: String,

    /// Quiet period before a local save is written
    pub save_debounce_ms: u64,

    /// Upper bound on a decompressed share payload
    pub max_share_payload_bytes: usize,

    pub zoom: ZoomConfig,
    pub style: StyleConfig,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            storage_key: "eplan_ann".to_string(),
            fragment_key: "ann".to_string(),
            save_debounce_ms: 200,
            max_share_payload_bytes: 8 * 1024 * 1024,
            zoom: ZoomConfig::default(),
            style: StyleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub initial: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self { initial: 1.2, min: 0.4, max: 3.0, step: 0.1 }
    }
}

/// Fixed paint parameters of the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Pen and rectangle line width, in canvas pixels
    pub line_width: f64,

    pub font_size: f64,
    pub font_family: String,

    /// Color given to new text notes
    pub text_color: Color,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            font_size: 16.0,
            font_family: "sans-serif".to_string(),
            text_color: Color::RED,
        }
    }
}

impl MarkupConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> MarkupResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: MarkupConfig = serde_json::from_str(&text)
            .map_err(|err| MarkupError::Config(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MarkupResult<()> {
        let key_ok = |key: &str| {
            !key.is_empty()
                && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !key_ok(&self.storage_key) {
            return Err(MarkupError::Config(format!("invalid storage_key {:?}", self.storage_key)));
        }
        if !key_ok(&self.fragment_key) {
            return Err(MarkupError::Config(format!(
                "invalid fragment_key {:?}",
                self.fragment_key
            )));
        }

        let zoom = &self.zoom;
        if !(zoom.min > 0.0 && zoom.min <= zoom.initial && zoom.initial <= zoom.max) {
            return Err(MarkupError::Config(format!(
                "zoom range must satisfy 0 < min <= initial <= max (got {} / {} / {})",
                zoom.min, zoom.initial, zoom.max
            )));
        }
        if zoom.step <= 0.0 {
            return Err(MarkupError::Config("zoom step must be positive".to_string()));
        }
        Ok(())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

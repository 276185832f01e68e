//! Stroke data model
//!
//! A stroke is one committed piece of markup on a page: a pen path, a
//! rectangle, or a text note. All coordinates are canvas pixels captured at
//! the zoom level the stroke was drawn at.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in canvas pixel space
///
/// Serialized as a two-element `[x, y]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    /// Create a new canvas point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for CanvasPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<CanvasPoint> for [f64; 2] {
    fn from(point: CanvasPoint) -> Self {
        [point.x, point.y]
    }
}

impl From<(f64, f64)> for CanvasPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// RGBA color representation
///
/// Serialized as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`-style hex, with or without alpha
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Color {
    pub const RED: Color = Color::rgb(0xe5, 0x39, 0x35);
    pub const YELLOW: Color = Color::rgb(0xff, 0xcc, 0x00);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color {value:?}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// One committed annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", try_from = "StrokeRecord")]
pub enum Stroke {
    /// Freehand path; fewer than two points paints nothing
    #[serde(rename = "pen")]
    Pen { color: Color, path: Vec<CanvasPoint> },

    /// Rectangle anchored at `(x, y)` with signed extent
    #[serde(rename = "rect")]
    Rect { color: Color, x: f64, y: f64, w: f64, h: f64 },

    /// Text anchored at a baseline point
    #[serde(rename = "text")]
    TextNote { color: Color, x: f64, y: f64, value: String },
}

impl Stroke {
    pub fn color(&self) -> Color {
        match self {
            Stroke::Pen { color, .. }
            | Stroke::Rect { color, .. }
            | Stroke::TextNote { color, .. } => *color,
        }
    }

    /// Short kind name, as used in the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Stroke::Pen { .. } => "pen",
            Stroke::Rect { .. } => "rect",
            Stroke::TextNote { .. } => "text",
        }
    }

    /// Check the invariants a stored stroke must satisfy
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Stroke::Pen { path, .. } => {
                if path.is_empty() {
                    return Err("pen stroke has an empty path".to_owned());
                }
                if !path.iter().all(CanvasPoint::is_finite) {
                    return Err("pen stroke has a non-finite point".to_owned());
                }
            }
            Stroke::Rect { x, y, w, h, .. } => {
                if ![x, y, w, h].iter().all(|v| v.is_finite()) {
                    return Err("rect stroke has a non-finite coordinate".to_owned());
                }
            }
            Stroke::TextNote { x, y, value, .. } => {
                if value.trim().is_empty() {
                    return Err("text note is empty".to_owned());
                }
                if !x.is_finite() || !y.is_finite() {
                    return Err("text note has a non-finite anchor".to_owned());
                }
            }
        }
        Ok(())
    }
}

/// Wire shapes accepted when reading strokes back
#[derive(Deserialize)]
#[serde(untagged)]
enum StrokeRecord {
    Tagged(TaggedStroke),
    Legacy(LegacyPen),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TaggedStroke {
    #[serde(rename = "pen")]
    Pen { color: Color, path: Vec<CanvasPoint> },
    #[serde(rename = "rect")]
    Rect { color: Color, x: f64, y: f64, w: f64, h: f64 },
    #[serde(rename = "text")]
    TextNote { color: Color, x: f64, y: f64, value: String },
}

/// Untyped `{ "path": [...] }` records written by the first overlay release,
/// which only had a yellow pen.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyPen {
    path: Vec<CanvasPoint>,
}

impl TryFrom<StrokeRecord> for Stroke {
    type Error = String;

    fn try_from(record: StrokeRecord) -> Result<Self, Self::Error> {
        let stroke = match record {
            StrokeRecord::Tagged(TaggedStroke::Pen { color, path }) => Stroke::Pen { color, path },
            StrokeRecord::Tagged(TaggedStroke::Rect { color, x, y, w, h }) => {
                Stroke::Rect { color, x, y, w, h }
            }
            StrokeRecord::Tagged(TaggedStroke::TextNote { color, x, y, value }) => {
                Stroke::TextNote { color, x, y, value }
            }
            StrokeRecord::Legacy(LegacyPen { path }) => Stroke::Pen { color: Color::YELLOW, path },
        };
        stroke.validate()?;
        Ok(stroke)
    }
}

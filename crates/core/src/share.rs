//! Share-link codec
//!
//! Packs a whole annotation store into a URL fragment parameter so a link can
//! carry markup without any server. The payload is compact JSON, zlib
//! compressed, then URL-safe base64 without padding:
//!
//! ```text
//! https://host/viewer.html#page=2&ann=eJyrVjJUslKKBgA...
//! ```
//!
//! Decoding never fails loudly. A missing key, bad base64, bad zlib, bad JSON
//! or an invalid store all read as "no shared annotations".

use crate::config::MarkupConfig;
use crate::error::{MarkupError, MarkupResult};
use crate::store::AnnotationStore;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use regex::Regex;
use std::io::{Read, Write};
use url::Url;

/// URL-safe alphabet; writes no padding, reads either form
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone)]
pub struct ShareCodec {
    key: String,
    pattern: Regex,
    max_payload_bytes: usize,
}

impl ShareCodec {
    pub fn new(key: &str, max_payload_bytes: usize) -> MarkupResult<Self> {
        let pattern = Regex::new(&format!(r"(?:^|[#&]){}=([^&]*)", regex::escape(key)))
            .map_err(|err| MarkupError::Config(format!("fragment key {key:?}: {err}")))?;

        Ok(Self { key: key.to_string(), pattern, max_payload_bytes })
    }

    pub fn from_config(config: &MarkupConfig) -> MarkupResult<Self> {
        Self::new(&config.fragment_key, config.max_share_payload_bytes)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Compress a store into a fragment-safe token
    pub fn encode(&self, store: &AnnotationStore) -> MarkupResult<String> {
        let json = serde_json::to_vec(store)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        let token = TOKEN_ENGINE.encode(compressed);
        tracing::debug!(
            json_bytes = json.len(),
            token_bytes = token.len(),
            strokes = store.stroke_count(),
            "encoded share token"
        );
        Ok(token)
    }

    /// Check whether a fragment carries the reserved key at all
    pub fn is_present(&self, fragment: &str) -> bool {
        self.pattern.is_match(fragment)
    }

    /// Extract and decode the shared store from a fragment
    ///
    /// The leading `#` is optional. Returns `None` when the key is absent or
    /// the payload is malformed in any way.
    pub fn decode(&self, fragment: &str) -> Option<AnnotationStore> {
        let token = self.pattern.captures(fragment)?.get(1)?.as_str();

        match self.decode_token(token) {
            Ok(store) => Some(store),
            Err(reason) => {
                tracing::warn!(%reason, "ignoring malformed share payload");
                None
            }
        }
    }

    fn decode_token(&self, token: &str) -> Result<AnnotationStore, String> {
        let compressed = TOKEN_ENGINE.decode(token).map_err(|err| format!("base64: {err}"))?;

        let limit = self.max_payload_bytes as u64;
        let mut json = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .take(limit + 1)
            .read_to_end(&mut json)
            .map_err(|err| format!("zlib: {err}"))?;
        if json.len() as u64 > limit {
            return Err(format!("payload exceeds {limit} bytes"));
        }

        let value: serde_json::Value =
            serde_json::from_slice(&json).map_err(|err| format!("json: {err}"))?;
        AnnotationStore::from_value(value).map_err(|err| err.to_string())
    }

    /// Set the reserved pair in a fragment, keeping every other pair
    pub fn embed(&self, fragment: &str, token: &str) -> String {
        let mut pairs = self.other_pairs(fragment);
        pairs.push(format!("{}={token}", self.key));
        pairs.join("&")
    }

    /// Remove the reserved pair from a fragment
    pub fn strip(&self, fragment: &str) -> String {
        self.other_pairs(fragment).join("&")
    }

    fn other_pairs(&self, fragment: &str) -> Vec<String> {
        let prefix = format!("{}=", self.key);
        fragment
            .trim_start_matches('#')
            .split('&')
            .filter(|pair| !pair.is_empty() && *pair != self.key && !pair.starts_with(&prefix))
            .map(str::to_string)
            .collect()
    }

    /// Build a shareable link for `store` on top of `base`
    pub fn share_url(&self, base: &Url, store: &AnnotationStore) -> MarkupResult<Url> {
        let token = self.encode(store)?;
        let mut url = base.clone();
        let fragment = self.embed(base.fragment().unwrap_or(""), &token);
        url.set_fragment(Some(&fragment));
        Ok(url)
    }
}

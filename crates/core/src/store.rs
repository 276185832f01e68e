//! Per-page stroke store
//!
//! The store is the single source of truth for the overlay: every surface is
//! reproducible by replaying a page's strokes in order.

use crate::error::{MarkupError, MarkupResult};
use crate::stroke::Stroke;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 1-based page number
///
/// Serialized as a bare integer, which JSON maps render as a decimal string
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageId(u32);

impl PageId {
    /// First page of any document
    pub const FIRST: PageId = PageId(1);

    /// Create a page id; `None` for page 0
    pub fn new(page: u32) -> Option<Self> {
        (page >= 1).then_some(Self(page))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PageId {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageId::new(value).ok_or_else(|| "page numbers start at 1".to_owned())
    }
}

impl From<PageId> for u32 {
    fn from(page: PageId) -> Self {
        page.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from page to its ordered strokes
///
/// Order within a page is append order. Pages that were never drawn on are
/// absent; a cleared page keeps an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationStore {
    pages: BTreeMap<PageId, Vec<Stroke>>,
}

impl AnnotationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stroke to a page
    pub fn append(&mut self, page: PageId, stroke: Stroke) {
        self.pages.entry(page).or_default().push(stroke);
    }

    /// Remove and return the most recent stroke of a page
    pub fn pop_last(&mut self, page: PageId) -> Option<Stroke> {
        self.pages.get_mut(&page).and_then(Vec::pop)
    }

    /// Empty a page's strokes, keeping its key
    pub fn clear(&mut self, page: PageId) {
        self.pages.entry(page).or_default().clear();
    }

    /// Strokes of a page in paint order
    pub fn page(&self, page: PageId) -> &[Stroke] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterate over every page entry, including empty ones
    pub fn pages(&self) -> impl Iterator<Item = (PageId, &[Stroke])> {
        self.pages.iter().map(|(page, strokes)| (*page, strokes.as_slice()))
    }

    /// Total strokes across all pages
    pub fn stroke_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Check whether no page holds a stroke
    pub fn is_empty(&self) -> bool {
        self.stroke_count() == 0
    }

    /// Replace the whole store with a JSON value
    ///
    /// The value must be an object mapping page numbers to stroke lists. On
    /// any validation failure the current contents are left untouched.
    pub fn replace_all(&mut self, value: serde_json::Value) -> MarkupResult<()> {
        let replacement = Self::from_value(value)?;
        *self = replacement;
        Ok(())
    }

    /// Replace the whole store with an already-validated one
    pub fn replace_with(&mut self, replacement: AnnotationStore) {
        *self = replacement;
    }

    /// Canonical JSON structure, accepted back by [`Self::replace_all`]
    pub fn serialize(&self) -> serde_json::Value {
        // Keys are integers and every stroke field is finite, so this cannot fail
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    /// Compact JSON text
    pub fn to_json(&self) -> MarkupResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Human-readable JSON text, used for file export
    pub fn to_json_pretty(&self) -> MarkupResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON value
    pub fn from_value(value: serde_json::Value) -> MarkupResult<Self> {
        if !value.is_object() {
            return Err(MarkupError::Malformed(format!(
                "expected an object mapping page numbers to strokes, found {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|err| MarkupError::Malformed(err.to_string()))
    }

    /// Parse and validate JSON text
    pub fn from_json(text: &str) -> MarkupResult<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

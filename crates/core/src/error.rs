//! Error types for the annotation core

use pdf_markup_engine::PdfEngineError;
use pdf_markup_storage::StorageError;
use thiserror::Error;

/// Result type for annotation core operations
pub type MarkupResult<T> = Result<T, MarkupError>;

#[derive(Error, Debug)]
pub enum MarkupError {
    /// JSON that parsed but is not a valid annotation store
    #[error("malformed annotation data: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The rendering engine failed or is unavailable
    #[error("rendering engine error: {0}")]
    Engine(#[from] PdfEngineError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

//! Error types for PDF compaction operations

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, CompactError>;

/// Operation-level failures.
///
/// Per-image problems never show up here; they are reported as
/// [`crate::transcode::SkipReason`] inside the rewrite report.
#[derive(Error, Debug)]
pub enum CompactError {
    #[error("Unknown compression level: {0}")]
    InvalidLevel(String),

    #[error("Failed to load PDF: {0}")]
    LoadError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// No file part was supplied at the boundary
    #[error("No file part")]
    MissingUpload,

    /// A file part was supplied but it had no name or no content
    #[error("No selected file")]
    EmptyUpload,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

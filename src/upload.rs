//! Validated input at the request boundary

use crate::error::{CompactError, Result};

/// A file part as received by the boundary, classified once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upload {
    Valid { bytes: Vec<u8>, name: String },
    /// No file part in the request
    Missing,
    /// A file part with no name or no content
    Empty,
}

impl Upload {
    pub fn from_parts(name: Option<&str>, bytes: Option<Vec<u8>>) -> Self {
        match (name, bytes) {
            (None, None) => Upload::Missing,
            (Some(name), Some(bytes)) if !name.trim().is_empty() && !bytes.is_empty() => {
                Upload::Valid {
                    bytes,
                    name: name.to_string(),
                }
            }
            _ => Upload::Empty,
        }
    }

    /// The bytes and file name, or the matching boundary error
    pub fn into_valid(self) -> Result<(Vec<u8>, String)> {
        match self {
            Upload::Valid { bytes, name } => Ok((bytes, name)),
            Upload::Missing => Err(CompactError::MissingUpload),
            Upload::Empty => Err(CompactError::EmptyUpload),
        }
    }
}

/// File name without its last extension (`"report.v2.pdf"` → `"report.v2"`)
pub fn base_name(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => file_name,
    }
}

use std::path::PathBuf;

use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod format;
pub mod ocr;
pub mod raster;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, PdfDocument};
pub use format::DocumentFormat;
pub use ocr::{OcrEngine, OcrError, recognize};
pub use raster::ImageError;

/// Structural failure of a whole extraction call.
///
/// Only these errors reach the caller. Per-image problems (undecodable
/// bytes, OCR failures) are handled inside the extractors and never
/// surface here.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{}: expected a {expected} file", .path.display())]
    InvalidFormat {
        path: PathBuf,
        expected: &'static str,
    },
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Build an [`ExtractError::Unreadable`] from any displayable cause.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ExtractError::Unreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

use std::path::Path;

use image::DynamicImage;
use thiserror::Error;

use ocrweave_core::{BackendError, DocumentFormat, ImageError, OcrEngine, OcrError, recognize};

pub mod cell;
pub mod config;
pub mod delimited;
pub mod dialect;
pub mod docx;
pub mod pdf;

pub use cell::{CellContent, classify_cell};
pub use config::{ConfigError, ExtractConfig, ExtractConfigBuilder};
pub use delimited::CsvExtractor;
pub use dialect::{Dialect, DialectSniffer, StructuralSniffer};
pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
// Re-export domain types from core (canonical definitions live there)
pub use ocrweave_core::{ExtractError, PdfBackend, PdfDocument};

/// Why an embedded image produced no OCR text. Never returned to callers:
/// the extractors log it and substitute their fallback contribution.
#[derive(Error, Debug)]
pub(crate) enum ImageFailure {
    #[error("page render failed: {0}")]
    Render(#[from] BackendError),
    #[error("image decode failed: {0}")]
    Decode(#[from] ImageError),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Decode result in, recognized text out. The decoded image is dropped
/// before returning.
pub(crate) fn ocr_image(
    engine: &dyn OcrEngine,
    image: Result<DynamicImage, ImageError>,
) -> Result<String, ImageFailure> {
    let image = image?;
    Ok(recognize(engine, &image)?)
}

/// Shared precondition of the CSV and DOCX extractors: the right
/// extension (case-insensitive), then existence.
pub(crate) fn ensure_input(path: &Path, format: DocumentFormat) -> Result<(), ExtractError> {
    if !format.matches_path(path) {
        return Err(ExtractError::InvalidFormat {
            path: path.to_path_buf(),
            expected: match format {
                DocumentFormat::Csv => ".csv",
                DocumentFormat::Docx => ".docx",
                DocumentFormat::Pdf => ".pdf",
            },
        });
    }
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_checked_before_existence() {
        let err = ensure_input(Path::new("/no/such/file.txt"), DocumentFormat::Csv).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidFormat { expected: ".csv", .. }));

        let err = ensure_input(Path::new("/no/such/file.CSV"), DocumentFormat::Csv).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }
}

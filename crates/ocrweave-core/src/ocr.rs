use std::panic::{self, AssertUnwindSafe};

use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine panicked: {0}")]
    Panicked(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Optical character recognition over a decoded raster image.
///
/// One engine instance is shared by every extractor, so implementations
/// must be safe to call from several threads when callers extract
/// documents concurrently.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in `image`. An image with no text yields an
    /// empty string, not an error.
    fn perform_ocr(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Run `engine` on `image`, converting a panic inside the engine into
/// [`OcrError::Panicked`].
pub fn recognize(engine: &dyn OcrEngine, image: &DynamicImage) -> Result<String, OcrError> {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.perform_ocr(image))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(OcrError::Panicked(message))
        }
    }
}

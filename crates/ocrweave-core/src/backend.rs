use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("failed to render page: {0}")]
    RenderError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF engines.
///
/// Implementors open a document and hand out per-page access; the page
/// walk (native text first, OCR of rendered pages otherwise) lives in
/// `ocrweave_extract::PdfExtractor`.
pub trait PdfBackend: Send + Sync {
    /// Open the PDF at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError>;
}

/// An opened PDF. Pages are addressed by zero-based index.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Native text layer of a page, in reading order. Empty or
    /// whitespace-only for scanned pages.
    fn page_text(&self, index: usize) -> Result<String, BackendError>;

    /// Rasterize a page at `dpi` and return it encoded as PNG.
    fn render_page(&self, index: usize, dpi: u32) -> Result<Vec<u8>, BackendError>;
}

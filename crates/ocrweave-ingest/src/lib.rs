use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use ocrweave_core::{DocumentFormat, OcrEngine, PdfBackend};
use ocrweave_extract::{CsvExtractor, DocxExtractor, ExtractConfig, PdfExtractor};

pub mod payload;

// Re-export domain types for convenience
pub use ocrweave_core::ExtractError;
pub use payload::{ExtractedDocument, FileError, FileItem, Payload};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("invalid upload payload: {0}")]
    Payload(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF support not compiled in (enable the `pdf` feature of ocrweave-ingest)")]
    NoPdfSupport,
}

/// The three extractors over one shared OCR engine, routed by format.
pub struct Extractors {
    csv: CsvExtractor,
    docx: DocxExtractor,
    pdf: Option<PdfExtractor>,
    config: ExtractConfig,
    ocr: Arc<dyn OcrEngine>,
}

impl Extractors {
    /// Build the extractors. With the `pdf` feature, PDFs are read through
    /// MuPDF; without it they fail with [`IngestError::NoPdfSupport`] unless
    /// a backend is supplied via [`with_pdf_backend`](Self::with_pdf_backend).
    pub fn new(ocr: Arc<dyn OcrEngine>, config: &ExtractConfig) -> Self {
        Self {
            csv: CsvExtractor::with_config(Arc::clone(&ocr), config),
            docx: DocxExtractor::new(Arc::clone(&ocr)),
            pdf: default_pdf(&ocr, config),
            config: config.clone(),
            ocr,
        }
    }

    /// Replace the PDF backend.
    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf = Some(PdfExtractor::with_config(
            Arc::clone(&self.ocr),
            backend,
            &self.config,
        ));
        self
    }

    /// Extract text from `path`, dispatching on its extension
    /// (case-insensitive).
    pub fn extract(&self, path: &Path) -> Result<String, IngestError> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            ExtractError::InvalidFormat {
                path: path.to_path_buf(),
                expected: ".csv, .docx or .pdf",
            }
        })?;
        self.extract_as(path, format)
    }

    /// Extract text from `path` as `format`, regardless of its extension.
    pub(crate) fn extract_as(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<String, IngestError> {
        tracing::debug!(path = %path.display(), %format, "extracting");
        let text = match format {
            DocumentFormat::Csv => self.csv.extract_text(path)?,
            DocumentFormat::Docx => self.docx.extract_text(path)?,
            DocumentFormat::Pdf => self
                .pdf
                .as_ref()
                .ok_or(IngestError::NoPdfSupport)?
                .extract_text_from_pdf(path)?,
        };
        Ok(text)
    }
}

#[cfg(feature = "pdf")]
fn default_pdf(ocr: &Arc<dyn OcrEngine>, config: &ExtractConfig) -> Option<PdfExtractor> {
    let backend = Arc::new(ocrweave_pdf_mupdf::MupdfBackend::new());
    Some(PdfExtractor::with_config(Arc::clone(ocr), backend, config))
}

#[cfg(not(feature = "pdf"))]
fn default_pdf(_ocr: &Arc<dyn OcrEngine>, _config: &ExtractConfig) -> Option<PdfExtractor> {
    None
}

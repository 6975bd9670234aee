use std::path::Path;

use mupdf::{Colorspace, Document, ImageFormat, Matrix, Page, TextPageFlags};

use ocrweave_core::{BackendError, PdfBackend, PdfDocument};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island. It isolates the mupdf dependency
/// (which is AGPL-3.0) so that CSV and DOCX extraction do not transitively
/// depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let page_count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        Ok(Box::new(MupdfDocument {
            document,
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

/// An open MuPDF document.
pub struct MupdfDocument {
    document: Document,
    page_count: usize,
}

impl MupdfDocument {
    fn load(&self, index: usize) -> Result<Page, BackendError> {
        let number = i32::try_from(index)
            .map_err(|_| BackendError::ExtractionError(format!("page {} out of range", index)))?;
        self.document
            .load_page(number)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))
    }
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        let page = self.load(index)?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        // Block/line iteration matches PyMuPDF's get_text() layout
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }
        Ok(page_text)
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<Vec<u8>, BackendError> {
        let page = self.load(index)?;
        let scale = dpi as f32 / PDF_POINTS_PER_INCH;
        let pixmap = page
            .to_pixmap(
                &Matrix::new_scale(scale, scale),
                &Colorspace::device_rgb(),
                false,
                true,
            )
            .map_err(|e| BackendError::RenderError(e.to_string()))?;

        let mut png = Vec::new();
        pixmap
            .write_to(&mut png, ImageFormat::PNG)
            .map_err(|e| BackendError::RenderError(e.to_string()))?;
        Ok(png)
    }
}

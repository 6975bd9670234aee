use std::path::Path;
use std::sync::Arc;

use ocrweave_core::{ExtractError, OcrEngine, PdfBackend, PdfDocument, raster};

use crate::config::ExtractConfig;
use crate::{ImageFailure, ocr_image};

/// Text extraction for PDFs, mixing the native text layer with OCR.
///
/// Pages with any non-whitespace native text are taken verbatim and never
/// OCR'd. Pages without a text layer (scans) are rasterized and OCR'd
/// once. No extension or existence check is made here: whatever the
/// backend cannot open fails as [`ExtractError::Unreadable`].
pub struct PdfExtractor {
    ocr: Arc<dyn OcrEngine>,
    backend: Arc<dyn PdfBackend>,
    render_dpi: u32,
}

impl PdfExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, backend: Arc<dyn PdfBackend>) -> Self {
        Self::with_config(ocr, backend, &ExtractConfig::default())
    }

    pub fn with_config(
        ocr: Arc<dyn OcrEngine>,
        backend: Arc<dyn PdfBackend>,
        config: &ExtractConfig,
    ) -> Self {
        Self {
            ocr,
            backend,
            render_dpi: config.render_dpi(),
        }
    }

    /// Extract all pages in order. Each page contribution is prefixed with
    /// a newline; the result is trimmed.
    pub fn extract_text_from_pdf(&self, path: &Path) -> Result<String, ExtractError> {
        let document = self
            .backend
            .open(path)
            .map_err(|e| ExtractError::unreadable(path, e))?;

        let page_count = document.page_count();
        let mut all_text = String::new();
        let mut ocr_pages = 0usize;

        for index in 0..page_count {
            let text = document
                .page_text(index)
                .map_err(|e| ExtractError::unreadable(path, e))?;

            if !text.trim().is_empty() {
                all_text.push('\n');
                all_text.push_str(&text);
                continue;
            }

            tracing::debug!(page = index + 1, "no text layer, rasterizing for OCR");
            ocr_pages += 1;
            match self.ocr_page(document.as_ref(), index) {
                Ok(text) => {
                    all_text.push('\n');
                    all_text.push_str(&text);
                }
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "failed to OCR scanned page");
                }
            }
        }

        tracing::debug!(path = %path.display(), pages = page_count, ocr_pages, "extracted PDF");
        Ok(all_text.trim().to_string())
    }

    fn ocr_page(&self, document: &dyn PdfDocument, index: usize) -> Result<String, ImageFailure> {
        let png = document.render_page(index, self.render_dpi)?;
        ocr_image(self.ocr.as_ref(), raster::decode_bytes(&png))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{DynamicImage, ImageFormat};
    use ocrweave_core::{BackendError, OcrError};

    use super::*;

    /// A page either has a text layer or a raster (PNG bytes, or junk).
    #[derive(Clone)]
    enum Page {
        Text(&'static str),
        Scan(Vec<u8>),
    }

    struct ScriptedPdf {
        pages: Vec<Page>,
        renders: Arc<Mutex<Vec<(usize, u32)>>>,
    }

    impl ScriptedPdf {
        fn new(pages: Vec<Page>) -> Self {
            Self {
                pages,
                renders: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl PdfBackend for ScriptedPdf {
        fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
            if path.ends_with("broken.pdf") {
                return Err(BackendError::OpenError("no objects found".into()));
            }
            Ok(Box::new(ScriptedDocument {
                pages: self.pages.clone(),
                renders: Arc::clone(&self.renders),
            }))
        }
    }

    struct ScriptedDocument {
        pages: Vec<Page>,
        renders: Arc<Mutex<Vec<(usize, u32)>>>,
    }

    impl PdfDocument for ScriptedDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, index: usize) -> Result<String, BackendError> {
            Ok(match &self.pages[index] {
                Page::Text(t) => t.to_string(),
                Page::Scan(_) => " \n".to_string(),
            })
        }

        fn render_page(&self, index: usize, dpi: u32) -> Result<Vec<u8>, BackendError> {
            self.renders.lock().unwrap().push((index, dpi));
            match &self.pages[index] {
                Page::Scan(png) => Ok(png.clone()),
                Page::Text(_) => Ok(png(1)),
            }
        }
    }

    /// Reports the width of the image it was given.
    struct WidthOcr {
        calls: AtomicUsize,
    }

    impl WidthOcr {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl OcrEngine for WidthOcr {
        fn perform_ocr(&self, image: &DynamicImage) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if image.width() == 13 {
                return Err(OcrError::Engine("unlucky".into()));
            }
            Ok(format!("ocr page width {}", image.width()))
        }
    }

    fn png(width: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_luma8(width, 2)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn text_pages_skip_ocr() {
        let ocr = WidthOcr::new();
        let backend = Arc::new(ScriptedPdf::new(vec![
            Page::Text("First page\n"),
            Page::Text("Second page\n"),
        ]));
        let extractor = PdfExtractor::new(ocr.clone(), backend.clone());

        let text = extractor.extract_text_from_pdf(Path::new("doc.pdf")).unwrap();
        assert_eq!(text, "First page\n\nSecond page");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
        assert!(backend.renders.lock().unwrap().is_empty());
    }

    #[test]
    fn scanned_page_is_rendered_and_ocrd_once() {
        let ocr = WidthOcr::new();
        let backend = Arc::new(ScriptedPdf::new(vec![
            Page::Text("Cover\n"),
            Page::Scan(png(7)),
            Page::Text("Appendix\n"),
        ]));
        let extractor = PdfExtractor::new(ocr.clone(), backend.clone());

        let text = extractor.extract_text_from_pdf(Path::new("mixed.pdf")).unwrap();
        assert_eq!(text, "Cover\n\nocr page width 7\nAppendix");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*backend.renders.lock().unwrap(), vec![(1, 300)]);
    }

    #[test]
    fn render_dpi_comes_from_config() {
        let ocr = WidthOcr::new();
        let backend = Arc::new(ScriptedPdf::new(vec![Page::Scan(png(3))]));
        let config = ExtractConfig::builder().render_dpi(150).build().unwrap();
        let extractor = PdfExtractor::with_config(ocr, backend.clone(), &config);

        assert_eq!(
            extractor.extract_text_from_pdf(Path::new("a.pdf")).unwrap(),
            "ocr page width 3"
        );
        assert_eq!(*backend.renders.lock().unwrap(), vec![(0, 150)]);
    }

    #[test]
    fn failed_page_ocr_omits_only_that_page() {
        let ocr = WidthOcr::new();
        let backend = Arc::new(ScriptedPdf::new(vec![
            Page::Scan(png(13)),
            Page::Scan(b"not a png".to_vec()),
            Page::Scan(png(4)),
        ]));
        let extractor = PdfExtractor::new(ocr.clone(), backend);

        let text = extractor.extract_text_from_pdf(Path::new("scan.pdf")).unwrap();
        assert_eq!(text, "ocr page width 4");
        // The junk raster never reaches the engine.
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unopenable_pdf_is_unreadable() {
        let extractor = PdfExtractor::new(WidthOcr::new(), Arc::new(ScriptedPdf::new(vec![])));
        let err = extractor
            .extract_text_from_pdf(Path::new("/tmp/broken.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable { .. }));
    }

    #[test]
    fn empty_document_yields_empty_string() {
        let extractor = PdfExtractor::new(WidthOcr::new(), Arc::new(ScriptedPdf::new(vec![])));
        assert_eq!(extractor.extract_text_from_pdf(Path::new("e.pdf")).unwrap(), "");
    }
}

//! Shared fixtures for the extractor integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use image::{DynamicImage, ImageFormat};
use ocrweave_core::{OcrEngine, OcrError};
use zip::write::SimpleFileOptions;

type Respond = dyn Fn(&DynamicImage) -> Result<String, OcrError> + Send + Sync;

/// Deterministic OCR engine that counts its calls.
pub struct StubOcr {
    respond: Box<Respond>,
    calls: AtomicUsize,
}

impl StubOcr {
    pub fn new(
        respond: impl Fn(&DynamicImage) -> Result<String, OcrError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        })
    }

    /// Answers `text-<width>`, fails for 13-pixel-wide images, and returns
    /// only whitespace for 11-pixel-wide ones.
    pub fn by_width() -> Arc<Self> {
        Self::new(|image| match image.width() {
            13 => Err(OcrError::Engine("recognition failed".into())),
            11 => Ok("  \n ".to_string()),
            w => Ok(format!("text-{}", w)),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for StubOcr {
    fn perform_ocr(&self, image: &DynamicImage) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(image)
    }
}

/// PNG bytes of a blank image `width` pixels wide.
pub fn png_bytes(width: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, 3)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn png_data_uri(width: u32) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(width))
    )
}

/// Data URI of a `width` x 16 PNG filled with pseudo-random pixels, so the
/// encoded payload does not compress away.
pub fn noisy_png_data_uri(width: u32) -> String {
    let mut state: u32 = 0x2545_f491;
    let pixels = image::RgbImage::from_fn(width, 16, |_, _| {
        let mut channel = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    )
}

/// Minimal WordprocessingML package writer.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    rels: Vec<String>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-run paragraph.
    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    /// Append raw body XML.
    pub fn raw_body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    /// Embed `bytes` as `word/media/<name>` with an image relationship.
    pub fn image(mut self, name: &str, bytes: Vec<u8>) -> Self {
        let id = format!("rIdImg{}", self.rels.len() + 1);
        self.rels.push(format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            id, name
        ));
        self.media.push((format!("word/media/{}", name), bytes));
        self
    }

    /// Add a relationship without a backing part.
    pub fn relationship(mut self, xml: &str) -> Self {
        self.rels.push(xml.to_string());
        self
    }

    pub fn write(self, path: &Path) {
        self.write_with(path, true);
    }

    /// Write the package, optionally leaving out the main document part.
    pub fn write_with(self, path: &Path, include_document: bool) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(PACKAGE_RELS.as_bytes()).unwrap();

        if include_document {
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}<w:sectPr/></w:body></w:document>"#,
                    self.body
                )
                .as_bytes(),
            )
            .unwrap();
        }

        zip.start_file("word/_rels/document.xml.rels", options).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                self.rels.join("")
            )
            .as_bytes(),
        )
        .unwrap();

        for (name, bytes) in &self.media {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(bytes).unwrap();
        }

        zip.finish().unwrap();
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

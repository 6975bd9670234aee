use std::path::Path;

use ocrweave_core::raster::DATA_URI_PREFIX;

/// What a CSV cell holds, decided before any image is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellContent<'a> {
    /// Ordinary text (already trimmed).
    PlainText(&'a str),
    /// A `data:image/...` URI carrying base64 image bytes.
    ImageDataUri(&'a str),
    /// An existing file with an image extension.
    ImagePath(&'a Path),
}

impl<'a> CellContent<'a> {
    /// The trimmed cell text, whatever the classification.
    pub fn as_str(&self) -> &'a str {
        match *self {
            CellContent::PlainText(s) | CellContent::ImageDataUri(s) => s,
            // Built from a &str in classify_cell, so always valid UTF-8.
            CellContent::ImagePath(p) => p.to_str().unwrap_or_default(),
        }
    }

    pub fn is_image(&self) -> bool {
        !matches!(self, CellContent::PlainText(_))
    }
}

/// Classify a raw cell value.
///
/// The value is trimmed first. A `data:image/` prefix wins over everything
/// else; otherwise the value is an image path when it ends in one of
/// `image_extensions` (case-insensitive, no leading dot) and `exists`
/// reports it present. `exists` is only consulted for values with an
/// image extension.
pub fn classify_cell<'a>(
    raw: &'a str,
    image_extensions: &[String],
    exists: impl Fn(&Path) -> bool,
) -> CellContent<'a> {
    let value = raw.trim();

    if value.starts_with(DATA_URI_PREFIX) {
        return CellContent::ImageDataUri(value);
    }

    if has_image_extension(value, image_extensions) {
        let path = Path::new(value);
        if exists(path) {
            return CellContent::ImagePath(path);
        }
    }

    CellContent::PlainText(value)
}

/// [`classify_cell`] against the real file system.
pub fn classify_cell_on_disk<'a>(raw: &'a str, image_extensions: &[String]) -> CellContent<'a> {
    classify_cell(raw, image_extensions, Path::exists)
}

fn has_image_extension(value: &str, image_extensions: &[String]) -> bool {
    let lower = value.to_lowercase();
    image_extensions.iter().any(|ext| {
        lower.len() > ext.len() + 1
            && lower.ends_with(ext.as_str())
            && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.'
    })
}

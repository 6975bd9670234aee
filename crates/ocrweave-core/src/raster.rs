//! Decoding of embedded raster images: raw bytes, `data:image/...` URIs,
//! and image files on disk.

use std::path::Path;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use image::{DynamicImage, ImageReader};
use thiserror::Error;

/// Prefix that marks a CSV cell as an inline image.
pub const DATA_URI_PREFIX: &str = "data:image/";

/// Standard alphabet, padding optional. Uploaded data URIs are often
/// produced by tools that drop the trailing `=`.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("data URI has no payload")]
    MissingPayload,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode base64 text, ignoring embedded whitespace and line breaks.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT_BASE64.decode(compact)
}

/// Decode an in-memory encoded image (PNG, JPEG, ...). The format is
/// sniffed from the content.
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Decode the image carried by a `data:image/<type>;base64,<payload>` URI.
///
/// Everything after the first comma is the payload.
pub fn decode_data_uri(uri: &str) -> Result<DynamicImage, ImageError> {
    let (_, payload) = uri.split_once(',').ok_or(ImageError::MissingPayload)?;
    let bytes = decode_base64(payload)?;
    decode_bytes(&bytes)
}

/// Open an image file. The format is sniffed from the file content rather
/// than trusted from the extension.
pub fn open_file(path: &Path) -> Result<DynamicImage, ImageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.decode()?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use image::ImageFormat;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn data_uri_decodes_png_payload() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 2));
        let uri = format!("data:image/png;base64,{}", encoded);
        let image = decode_data_uri(&uri).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn data_uri_tolerates_missing_padding_and_line_breaks() {
        let encoded = base64::engine::general_purpose::STANDARD_NO_PAD.encode(png_bytes(5, 1));
        let (head, tail) = encoded.split_at(encoded.len() / 2);
        let uri = format!("data:image/png;base64,{}\n{}", head, tail);
        assert_eq!(decode_data_uri(&uri).unwrap().width(), 5);
    }

    #[test]
    fn data_uri_without_comma_is_missing_payload() {
        assert!(matches!(
            decode_data_uri("data:image/png;base64"),
            Err(ImageError::MissingPayload)
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode_bytes(b"definitely not an image"),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn open_file_sniffs_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        // PNG content behind a .jpg name
        let path = dir.path().join("mislabeled.jpg");
        std::fs::write(&path, png_bytes(4, 4)).unwrap();
        assert_eq!(open_file(&path).unwrap().height(), 4);
    }
}

//! Upload payloads: documents sent inline as base64 strings.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ocrweave_core::{DocumentFormat, ExtractError, raster};

use crate::{Extractors, IngestError};

/// One uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileItem {
    pub filename: String,
    pub content_type: String,
    /// Base64-encoded file bytes.
    pub content: String,
}

impl FileItem {
    /// Format from the filename's extension, falling back to the declared
    /// content type.
    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::from_path(Path::new(&self.filename))
            .or_else(|| DocumentFormat::from_content_type(&self.content_type))
    }
}

/// A request body carrying uploaded documents. Other fields of the body
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload {
    pub files: Vec<FileItem>,
}

/// Text extracted from one [`FileItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    pub filename: String,
    pub text: String,
}

/// Extraction failure for one file of a [`Payload`].
#[derive(Error, Debug)]
#[error("{filename}: {source}")]
pub struct FileError {
    pub filename: String,
    #[source]
    pub source: IngestError,
}

impl Extractors {
    /// Decode an uploaded file into a temporary file with the right
    /// extension and extract it. The temporary file is removed on return.
    pub fn extract_item(&self, item: &FileItem) -> Result<String, IngestError> {
        let format = item.format().ok_or_else(|| ExtractError::InvalidFormat {
            path: item.filename.clone().into(),
            expected: ".csv, .docx or .pdf",
        })?;

        let bytes = raster::decode_base64(&item.content)
            .map_err(|e| IngestError::Payload(format!("{}: {}", item.filename, e)))?;

        let mut file = tempfile::Builder::new()
            .prefix("ocrweave-upload-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        tracing::debug!(
            filename = %item.filename,
            %format,
            bytes = bytes.len(),
            "extracting uploaded file"
        );
        self.extract_as(file.path(), format)
    }

    /// Extract every file of `payload`, in order. A failing file does not
    /// stop the others.
    pub fn extract_payload(&self, payload: &Payload) -> Vec<Result<ExtractedDocument, FileError>> {
        payload
            .files
            .iter()
            .map(|item| {
                self.extract_item(item)
                    .map(|text| ExtractedDocument {
                        filename: item.filename.clone(),
                        text,
                    })
                    .map_err(|source| {
                        tracing::warn!(
                            filename = %item.filename,
                            error = %source,
                            "failed to extract uploaded file"
                        );
                        FileError {
                            filename: item.filename.clone(),
                            source,
                        }
                    })
            })
            .collect()
    }
}

use std::fmt;
use std::path::Path;

/// MIME type Word uses for `.docx` packages.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The document containers ocrweave knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Csv,
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Some(DocumentFormat::Csv),
            "docx" => Some(DocumentFormat::Docx),
            "pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }

    /// Detect the format from a declared MIME type. Parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        match essence.as_str() {
            "text/csv" | "application/csv" => Some(DocumentFormat::Csv),
            DOCX_CONTENT_TYPE => Some(DocumentFormat::Docx),
            "application/pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Csv => "csv",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }

    /// Whether `path` carries this format's extension.
    pub fn matches_path(self, path: &Path) -> bool {
        DocumentFormat::from_path(path) == Some(self)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

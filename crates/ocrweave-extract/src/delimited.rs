use std::iter;
use std::path::Path;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};

use ocrweave_core::{DocumentFormat, ExtractError, OcrEngine, raster};

use crate::cell::{CellContent, classify_cell_on_disk};
use crate::config::ExtractConfig;
use crate::dialect::{Dialect, DialectSniffer, StructuralSniffer, sniff_or_default};
use crate::{ensure_input, ocr_image};

const CELL_SEPARATOR: &str = ", ";
const ROW_SEPARATOR: &str = "\n";

/// Text extraction for CSV files whose cells may hold images.
///
/// Every cell contributes its trimmed text, except cells holding a
/// `data:image/` URI or the path of an existing image file: those
/// contribute the OCR text of the image instead. If the image cannot be
/// decoded or recognized, the cell falls back to its trimmed text.
pub struct CsvExtractor {
    ocr: Arc<dyn OcrEngine>,
    sniffer: Box<dyn DialectSniffer>,
    sample_bytes: usize,
    image_extensions: Vec<String>,
}

impl CsvExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self::with_config(ocr, &ExtractConfig::default())
    }

    pub fn with_config(ocr: Arc<dyn OcrEngine>, config: &ExtractConfig) -> Self {
        Self {
            ocr,
            sniffer: Box::new(StructuralSniffer),
            sample_bytes: config.sniff_sample_bytes(),
            image_extensions: config.image_extensions().to_vec(),
        }
    }

    /// Replace the dialect sniffer.
    pub fn with_sniffer(mut self, sniffer: impl DialectSniffer + 'static) -> Self {
        self.sniffer = Box::new(sniffer);
        self
    }

    /// Extract the text of a `.csv` file: cells joined by `", "`, rows by
    /// `"\n"`. A blank line is an empty row.
    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        ensure_input(path, DocumentFormat::Csv)?;

        let content = std::fs::read(path)?;
        let dialect = self.detect_dialect(&content);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(dialect.delimiter)
            .quote(dialect.quote)
            .from_reader(content.as_slice());

        let mut rows: Vec<String> = Vec::new();
        let mut record = StringRecord::new();
        // Byte offset just past the last record read.
        let mut consumed = 0usize;
        while reader
            .read_record(&mut record)
            .map_err(|e| ExtractError::unreadable(path, e))?
        {
            // The reader skips blank lines; each one is still a row.
            rows.extend(iter::repeat_n(String::new(), blank_lines(&content, consumed)));

            let row = rows.len();
            let cells: Vec<String> = record
                .iter()
                .enumerate()
                .map(|(column, value)| self.cell_text(value, row, column))
                .collect();
            rows.push(cells.join(CELL_SEPARATOR));
            consumed = reader.position().byte() as usize;
        }
        rows.extend(iter::repeat_n(String::new(), blank_lines(&content, consumed)));

        tracing::debug!(path = %path.display(), rows = rows.len(), "extracted CSV");
        Ok(rows.join(ROW_SEPARATOR))
    }

    /// Sniff the dialect from the first `sample_bytes` of the file. A line
    /// cut off by the sample boundary is ignored by the sniffer.
    fn detect_dialect(&self, content: &[u8]) -> Dialect {
        let sample = &content[..content.len().min(self.sample_bytes)];
        let sample = String::from_utf8_lossy(sample);
        sniff_or_default(self.sniffer.as_ref(), &sample)
    }

    fn cell_text(&self, value: &str, row: usize, column: usize) -> String {
        let cell = classify_cell_on_disk(value, &self.image_extensions);
        let decoded = match cell {
            CellContent::PlainText(text) => return text.to_string(),
            CellContent::ImageDataUri(uri) => raster::decode_data_uri(uri),
            CellContent::ImagePath(path) => raster::open_file(path),
        };

        match ocr_image(self.ocr.as_ref(), decoded) {
            Ok(text) => text,
            Err(e) => {
                let source = match cell {
                    CellContent::ImagePath(_) => "file",
                    _ => "data URI",
                };
                tracing::warn!(
                    row,
                    column,
                    source,
                    error = %e,
                    "image OCR failed, keeping cell text"
                );
                cell.as_str().to_string()
            }
        }
    }
}

/// Number of blank lines starting at byte `from`: line terminators up to
/// the next record or the end of input. A `\n` completing the `\r\n`
/// that ended the previous record does not count.
fn blank_lines(content: &[u8], from: usize) -> usize {
    let mut i = from;
    if i > 0 && content.get(i - 1) == Some(&b'\r') && content.get(i) == Some(&b'\n') {
        i += 1;
    }

    let mut count = 0;
    while let Some(&b) = content.get(i) {
        match b {
            b'\r' if content.get(i + 1) == Some(&b'\n') => i += 2,
            b'\r' | b'\n' => i += 1,
            _ => break,
        }
        count += 1;
    }
    count
}

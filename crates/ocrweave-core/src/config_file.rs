use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub ocr: Option<OcrConfig>,
    pub csv: Option<CsvConfig>,
    pub pdf: Option<PdfConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Path or name of the `tesseract` executable.
    pub command: Option<String>,
    /// Tesseract language codes joined with `+`, e.g. `eng+deu`.
    pub languages: Option<String>,
    /// Tesseract page segmentation mode.
    pub psm: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvConfig {
    pub sniff_sample_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfConfig {
    pub render_dpi: Option<u32>,
}

/// Platform config directory path: `<config_dir>/ocrweave/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ocrweave").join("config.toml"))
}

/// Load config by cascading CWD `.ocrweave.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".ocrweave.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        ocr: Some(OcrConfig {
            command: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.command.clone())
                .or_else(|| base.ocr.as_ref().and_then(|o| o.command.clone())),
            languages: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.languages.clone())
                .or_else(|| base.ocr.as_ref().and_then(|o| o.languages.clone())),
            psm: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.psm)
                .or_else(|| base.ocr.as_ref().and_then(|o| o.psm)),
        }),
        csv: Some(CsvConfig {
            sniff_sample_bytes: overlay
                .csv
                .as_ref()
                .and_then(|c| c.sniff_sample_bytes)
                .or_else(|| base.csv.as_ref().and_then(|c| c.sniff_sample_bytes)),
        }),
        pdf: Some(PdfConfig {
            render_dpi: overlay
                .pdf
                .as_ref()
                .and_then(|p| p.render_dpi)
                .or_else(|| base.pdf.as_ref().and_then(|p| p.render_dpi)),
        }),
    }
}

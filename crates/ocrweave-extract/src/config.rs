use thiserror::Error;

use ocrweave_core::config_file::ConfigFile;

/// Smallest CSV sample the dialect sniffer is allowed to look at.
pub const MIN_SNIFF_SAMPLE_BYTES: usize = 1024;

/// Resolution at which text-less PDF pages are rasterized for OCR.
pub const DEFAULT_RENDER_DPI: u32 = 300;

const MAX_RENDER_DPI: u32 = 1200;

const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CSV sniff sample must be at least {} bytes, got {}", MIN_SNIFF_SAMPLE_BYTES, .0)]
    SampleTooSmall(usize),
    #[error("render DPI must be between 1 and {}, got {}", MAX_RENDER_DPI, .0)]
    RenderDpiOutOfRange(u32),
    #[error("image extension list is empty")]
    NoImageExtensions,
}

/// Tunables shared by the three extractors.
///
/// Use [`ExtractConfigBuilder`] to construct a validated non-default config.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Bytes read from the head of a CSV file for dialect sniffing.
    pub(crate) sniff_sample_bytes: usize,
    /// Lowercase extensions (no dot) that mark a CSV cell as an image path.
    pub(crate) image_extensions: Vec<String>,
    /// DPI used when a PDF page has to be rasterized.
    pub(crate) render_dpi: u32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            sniff_sample_bytes: MIN_SNIFF_SAMPLE_BYTES,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            render_dpi: DEFAULT_RENDER_DPI,
        }
    }
}

impl ExtractConfig {
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder::default()
    }

    pub fn sniff_sample_bytes(&self) -> usize {
        self.sniff_sample_bytes
    }

    pub fn image_extensions(&self) -> &[String] {
        &self.image_extensions
    }

    pub fn render_dpi(&self) -> u32 {
        self.render_dpi
    }
}

/// Builder for [`ExtractConfig`]. Unset fields keep their defaults;
/// [`build()`](Self::build) validates the result.
#[derive(Debug, Clone, Default)]
pub struct ExtractConfigBuilder {
    sniff_sample_bytes: Option<usize>,
    image_extensions: Option<Vec<String>>,
    render_dpi: Option<u32>,
}

impl ExtractConfigBuilder {
    pub fn sniff_sample_bytes(mut self, bytes: usize) -> Self {
        self.sniff_sample_bytes = Some(bytes);
        self
    }

    /// Replace the image extensions. Leading dots and case are normalized.
    pub fn image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.image_extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        );
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = Some(dpi);
        self
    }

    /// Seed unset fields from an on-disk config.
    pub fn with_file_config(mut self, file: &ConfigFile) -> Self {
        if self.sniff_sample_bytes.is_none() {
            self.sniff_sample_bytes = file.csv.as_ref().and_then(|c| c.sniff_sample_bytes);
        }
        if self.render_dpi.is_none() {
            self.render_dpi = file.pdf.as_ref().and_then(|p| p.render_dpi);
        }
        self
    }

    pub fn build(self) -> Result<ExtractConfig, ConfigError> {
        let defaults = ExtractConfig::default();

        let sniff_sample_bytes = self
            .sniff_sample_bytes
            .unwrap_or(defaults.sniff_sample_bytes);
        if sniff_sample_bytes < MIN_SNIFF_SAMPLE_BYTES {
            return Err(ConfigError::SampleTooSmall(sniff_sample_bytes));
        }

        let render_dpi = self.render_dpi.unwrap_or(defaults.render_dpi);
        if render_dpi == 0 || render_dpi > MAX_RENDER_DPI {
            return Err(ConfigError::RenderDpiOutOfRange(render_dpi));
        }

        let image_extensions = self
            .image_extensions
            .unwrap_or(defaults.image_extensions);
        if image_extensions.is_empty() {
            return Err(ConfigError::NoImageExtensions);
        }

        Ok(ExtractConfig {
            sniff_sample_bytes,
            image_extensions,
            render_dpi,
        })
    }
}

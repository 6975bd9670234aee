use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use image::{DynamicImage, ImageFormat};

use ocrweave_core::config_file::OcrConfig;
use ocrweave_core::{OcrEngine, OcrError};

/// Executable looked up on `PATH` when no command is configured.
pub const DEFAULT_COMMAND: &str = "tesseract";

/// Language pack used when none is configured.
pub const DEFAULT_LANGUAGES: &str = "eng";

/// [`OcrEngine`] that shells out to the `tesseract` CLI.
///
/// Each call writes the image to a temporary PNG and reads the recognized
/// text from stdout. The temporary file is removed when the call returns.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    languages: String,
    psm: Option<u8>,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            languages: DEFAULT_LANGUAGES.to_string(),
            psm: None,
        }
    }
}

impl From<&OcrConfig> for TesseractEngine {
    fn from(config: &OcrConfig) -> Self {
        let mut engine = Self::default();
        if let Some(ref command) = config.command {
            engine = engine.with_command(command);
        }
        if let Some(ref languages) = config.languages {
            engine = engine.with_languages(languages);
        }
        if let Some(psm) = config.psm {
            engine = engine.with_psm(psm);
        }
        engine
    }
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path or name of the tesseract executable.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Language codes joined with `+`, e.g. `eng+deu`. Blank input keeps
    /// the current languages.
    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        let languages = languages.into();
        if !languages.trim().is_empty() {
            self.languages = languages.trim().to_string();
        }
        self
    }

    /// Page segmentation mode passed as `--psm`.
    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = Some(psm);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    /// Whether the configured executable can be launched at all.
    pub fn available(&self) -> bool {
        self.version().is_ok()
    }

    /// First line of `tesseract --version`.
    pub fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| OcrError::Engine(format!("failed to run {}: {}", self.command, e)))?;

        // Older releases print the version banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "{} --version exited with {}",
                self.command, output.status
            )));
        }
        Ok(banner.lines().next().unwrap_or_default().trim().to_string())
    }

    fn args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.languages.clone().into(),
        ];
        if let Some(psm) = self.psm {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        args
    }
}

impl OcrEngine for TesseractEngine {
    fn perform_ocr(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("ocrweave-")
            .suffix(".png")
            .tempfile()?;

        // PNG has no float pixel formats.
        let encoded = match image {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgba8(image.to_rgba8())
                    .save_with_format(input.path(), ImageFormat::Png)
            }
            _ => image.save_with_format(input.path(), ImageFormat::Png),
        };
        encoded.map_err(|e| OcrError::Engine(format!("failed to encode image: {}", e)))?;

        tracing::debug!(
            command = %self.command,
            languages = %self.languages,
            width = image.width(),
            height = image.height(),
            "running tesseract"
        );
        let output = Command::new(&self.command)
            .args(self.args(input.path()))
            .output()
            .map_err(|e| OcrError::Engine(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| OcrError::Engine(format!("tesseract produced non-UTF-8 output: {}", e)))
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrweave_core::config_file::{self, ConfigFile, OcrConfig};
use ocrweave_extract::ExtractConfig;
use ocrweave_ingest::{Extractors, Payload};
use ocrweave_tesseract::TesseractEngine;

mod output;

use output::ColorMode;

/// ocrweave - Extract text from CSV, DOCX and PDF documents, OCR'ing embedded images
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Path or name of the tesseract executable [env: OCRWEAVE_TESSERACT]
    #[arg(long, global = true)]
    tesseract: Option<String>,

    /// Tesseract languages, joined with '+' [env: OCRWEAVE_LANGS]
    #[arg(long = "lang", global = true)]
    languages: Option<String>,

    /// Tesseract page segmentation mode
    #[arg(long, global = true)]
    psm: Option<u8>,

    /// DPI for rasterizing PDF pages without a text layer
    #[arg(long, global = true)]
    dpi: Option<u32>,

    /// Log per-page and per-image decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from one or more .csv, .docx or .pdf files
    Extract {
        /// Files to extract
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the text to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract every file of a JSON upload payload ({"files": [...]})
    Payload {
        /// Path to the JSON payload, or '-' for stdin
        path: PathBuf,

        /// Write the text to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit a JSON array of {filename, text | error} objects
        #[arg(long)]
        json: bool,
    },

    /// Check that the tesseract executable can be run
    CheckOcr,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let file_config = config_file::load_config();
    let engine = resolve_engine(&cli.global, &file_config);

    match cli.command {
        Command::CheckOcr => check_ocr(&engine, &cli.global),
        Command::Extract { files, output } => {
            let extractors = build_extractors(engine, &cli.global, &file_config)?;
            extract(&extractors, &files, output.as_deref(), &cli.global)
        }
        Command::Payload { path, output, json } => {
            let extractors = build_extractors(engine, &cli.global, &file_config)?;
            payload(&extractors, &path, output.as_deref(), json, &cli.global)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ocrweave=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "ocrweave=info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve OCR settings: CLI flags > env vars > config file > defaults.
fn resolve_engine(global: &GlobalArgs, file_config: &ConfigFile) -> TesseractEngine {
    let file_ocr = file_config.ocr.clone().unwrap_or_default();
    let ocr = OcrConfig {
        command: global
            .tesseract
            .clone()
            .or_else(|| std::env::var("OCRWEAVE_TESSERACT").ok())
            .or(file_ocr.command),
        languages: global
            .languages
            .clone()
            .or_else(|| std::env::var("OCRWEAVE_LANGS").ok())
            .or(file_ocr.languages),
        psm: global.psm.or(file_ocr.psm),
    };
    TesseractEngine::from(&ocr)
}

fn build_extractors(
    engine: TesseractEngine,
    global: &GlobalArgs,
    file_config: &ConfigFile,
) -> anyhow::Result<Extractors> {
    let mut builder = ExtractConfig::builder();
    if let Some(dpi) = global.dpi {
        builder = builder.render_dpi(dpi);
    }
    let config = builder
        .with_file_config(file_config)
        .build()
        .context("invalid extraction settings")?;

    if !engine.available() {
        tracing::warn!(
            command = engine.command(),
            "tesseract is not runnable; embedded images and scanned pages will yield no text"
        );
    }
    Ok(Extractors::new(Arc::new(engine), &config))
}

fn open_writer(output: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    })
}

fn extract(
    extractors: &Extractors,
    files: &[PathBuf],
    output: Option<&Path>,
    global: &GlobalArgs,
) -> anyhow::Result<()> {
    let color = ColorMode(!global.no_color && output.is_none());
    let mut writer = open_writer(output)?;
    let show_headers = files.len() > 1;
    let mut failed = 0usize;

    for (i, path) in files.iter().enumerate() {
        let name = path.display().to_string();
        match extractors.extract(path) {
            Ok(text) => {
                if show_headers {
                    output::print_header(&mut writer, &name, color)?;
                }
                output::print_document(&mut writer, &text, i + 1 < files.len())?;
            }
            Err(e) => {
                failed += 1;
                output::print_failure(&name, &e, ColorMode(!global.no_color));
            }
        }
    }
    writer.flush()?;

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be extracted", failed, files.len());
    }
    Ok(())
}

fn read_payload(path: &Path) -> anyhow::Result<Payload> {
    let body = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read payload from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?
    };
    serde_json::from_str(&body).context("payload is not a valid {\"files\": [...]} document")
}

fn payload(
    extractors: &Extractors,
    path: &Path,
    output: Option<&Path>,
    json: bool,
    global: &GlobalArgs,
) -> anyhow::Result<()> {
    let payload = read_payload(path)?;
    let results = extractors.extract_payload(&payload);
    let failed = results.iter().filter(|r| r.is_err()).count();
    let mut writer = open_writer(output)?;

    if json {
        let entries: Vec<serde_json::Value> = results
            .iter()
            .map(|result| match result {
                Ok(doc) => serde_json::json!({ "filename": doc.filename, "text": doc.text }),
                Err(e) => serde_json::json!({
                    "filename": e.filename,
                    "error": e.source.to_string()
                }),
            })
            .collect();
        serde_json::to_writer_pretty(&mut writer, &entries)?;
        writeln!(writer)?;
    } else {
        let color = ColorMode(!global.no_color && output.is_none());
        let total = results.len();
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(doc) => {
                    output::print_header(&mut writer, &doc.filename, color)?;
                    output::print_document(&mut writer, &doc.text, i + 1 < total)?;
                }
                Err(e) => {
                    output::print_failure(&e.filename, &e.source, ColorMode(!global.no_color))
                }
            }
        }
    }
    writer.flush()?;

    if failed > 0 {
        anyhow::bail!("{} of {} uploaded files could not be extracted", failed, results.len());
    }
    Ok(())
}

fn check_ocr(engine: &TesseractEngine, global: &GlobalArgs) -> anyhow::Result<()> {
    let color = ColorMode(!global.no_color);
    let mut stdout = std::io::stdout();
    match engine.version() {
        Ok(version) => {
            output::print_ocr_status(&mut stdout, engine.command(), Ok(version.as_str()), color)?;
            Ok(())
        }
        Err(e) => {
            let reason: &dyn std::fmt::Display = &e;
            output::print_ocr_status(&mut stdout, engine.command(), Err(reason), color)?;
            anyhow::bail!("tesseract is not available (languages: {})", engine.languages())
        }
    }
}

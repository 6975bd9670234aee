use std::io::Write;

use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the `==> name <==` separator used when several documents are
/// written to one stream.
pub fn print_header(w: &mut dyn Write, name: &str, color: ColorMode) -> std::io::Result<()> {
    let header = format!("==> {} <==", name);
    if color.enabled() {
        writeln!(w, "{}", header.bold())
    } else {
        writeln!(w, "{}", header)
    }
}

/// Print one document's text, followed by a blank line when more
/// documents follow.
pub fn print_document(w: &mut dyn Write, text: &str, more_follow: bool) -> std::io::Result<()> {
    if !text.is_empty() {
        writeln!(w, "{}", text)?;
    }
    if more_follow {
        writeln!(w)?;
    }
    Ok(())
}

/// Report a failed document on stderr.
pub fn print_failure(name: &str, error: &dyn std::fmt::Display, color: ColorMode) {
    if color.enabled() {
        eprintln!("{} {}: {}", "error:".red().bold(), name, error);
    } else {
        eprintln!("error: {}: {}", name, error);
    }
}

/// Print the result of probing the OCR executable.
pub fn print_ocr_status(
    w: &mut dyn Write,
    command: &str,
    version: Result<&str, &dyn std::fmt::Display>,
    color: ColorMode,
) -> std::io::Result<()> {
    match version {
        Ok(version) => {
            if color.enabled() {
                writeln!(w, "{} {} ({})", "✓".green(), command, version)
            } else {
                writeln!(w, "ok: {} ({})", command, version)
            }
        }
        Err(e) => {
            if color.enabled() {
                writeln!(w, "{} {} is not usable: {}", "✗".red(), command, e)
            } else {
                writeln!(w, "unavailable: {} is not usable: {}", command, e)
            }
        }
    }
}

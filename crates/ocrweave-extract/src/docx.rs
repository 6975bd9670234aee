//! DOCX text extraction.
//!
//! A `.docx` file is a zip package of WordprocessingML parts. The main
//! document part supplies the paragraphs; its relationship part lists the
//! embedded media, which is OCR'd and appended after all paragraph text.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Reader};
use zip::ZipArchive;
use zip::result::ZipError;

use ocrweave_core::{DocumentFormat, ExtractError, OcrEngine, raster};

use crate::{ensure_input, ocr_image};

const PACKAGE_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const IMAGE_REL: &str = "/image";

/// Largest part (XML or media) read from a package, decompressed.
const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Text extraction for Word documents.
///
/// Output is every non-blank body paragraph in document order, followed by
/// the OCR text of every image relationship of the main document part in
/// declaration order, joined with `"\n"`. Images are never interleaved
/// with the paragraphs that anchor them.
pub struct DocxExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl DocxExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        ensure_input(path, DocumentFormat::Docx)?;

        let file = BufReader::new(File::open(path)?);
        let mut archive =
            ZipArchive::new(file).map_err(|e| ExtractError::unreadable(path, e))?;

        let main_part =
            main_document_part(&mut archive).map_err(|e| ExtractError::unreadable(path, e))?;
        let document = read_part(&mut archive, &main_part)
            .map_err(|e| ExtractError::unreadable(path, e))?
            .ok_or_else(|| {
                ExtractError::unreadable(path, format!("missing main document part {}", main_part))
            })?;

        let mut contributions: Vec<String> = body_paragraphs(&document)
            .map_err(|e| ExtractError::unreadable(path, e))?
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        let paragraphs = contributions.len();

        let relationships = match read_part(&mut archive, &rels_part_for(&main_part)) {
            Ok(Some(xml)) => {
                parse_relationships(&xml).map_err(|e| ExtractError::unreadable(path, e))?
            }
            Ok(None) => Vec::new(),
            Err(e) => return Err(ExtractError::unreadable(path, e)),
        };

        for rel in relationships.iter().filter(|r| r.is_image()) {
            if let Some(text) = self.image_text(&mut archive, &main_part, rel) {
                contributions.push(text);
            }
        }

        tracing::debug!(
            path = %path.display(),
            paragraphs,
            images = contributions.len() - paragraphs,
            "extracted DOCX"
        );
        Ok(contributions.join("\n"))
    }

    /// OCR text of one image relationship, trimmed. `None` when the image
    /// is unavailable, undecodable, unrecognizable, or blank.
    fn image_text<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        source_part: &str,
        rel: &Relationship,
    ) -> Option<String> {
        if rel.external {
            tracing::warn!(
                id = %rel.id,
                target = %rel.target,
                "skipping external image relationship"
            );
            return None;
        }

        let part = resolve_target(source_part, &rel.target);
        let bytes = match read_part(archive, &part) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!(id = %rel.id, part = %part, "image part missing from package");
                return None;
            }
            Err(e) => {
                tracing::warn!(id = %rel.id, part = %part, error = %e, "failed to read image part");
                return None;
            }
        };

        match ocr_image(self.ocr.as_ref(), raster::decode_bytes(&bytes)) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::debug!(id = %rel.id, part = %part, "image produced no text");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(
                    id = %rel.id,
                    part = %part,
                    error = %e,
                    "failed to OCR image in DOCX"
                );
                None
            }
        }
    }
}

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Typed as an image relationship, or pointing at a target whose name
    /// mentions `image` (Word names media parts `media/imageN.ext`).
    pub fn is_image(&self) -> bool {
        self.rel_type.ends_with(IMAGE_REL) || self.target.contains("image")
    }
}

/// Read a whole part. `Ok(None)` if the package has no such entry.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, ZipError> {
    read_part_limited(archive, name, MAX_PART_BYTES)
}

/// [`read_part`] with an explicit ceiling on the decompressed size. The
/// size declared in the entry header is not trusted.
fn read_part_limited<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limit: u64,
) -> Result<Option<Vec<u8>>, ZipError> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut buf = Vec::new();
    file.take(limit + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Err(ZipError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("part {} exceeds {} bytes", name, limit),
        )));
    }
    Ok(Some(buf))
}

/// Locate the main document part through the package relationships,
/// defaulting to `word/document.xml`.
fn main_document_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, String> {
    let Some(xml) = read_part(archive, PACKAGE_RELS).map_err(|e| e.to_string())? else {
        return Ok(DEFAULT_MAIN_PART.to_string());
    };
    let relationships = parse_relationships(&xml).map_err(|e| e.to_string())?;
    Ok(relationships
        .into_iter()
        .find(|r| !r.external && r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
        .map(|r| resolve_target("", &r.target))
        .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string()))
}

/// `word/document.xml` → `word/_rels/document.xml.rels`
pub(crate) fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of the part that
/// declares it. Absolute targets (`/word/media/x.png`) are package-rooted.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if let Some(rooted) = target.strip_prefix('/') {
        return normalize(rooted, segments);
    }
    if let Some((dir, _)) = source_part.rsplit_once('/') {
        segments.extend(dir.split('/').filter(|s| !s.is_empty()));
    }
    normalize(target, segments)
}

fn normalize<'a>(path: &'a str, mut segments: Vec<&'a str>) -> String {
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

pub(crate) fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };
                for attr in e.attributes().flatten() {
                    let value = attr.decode_and_unescape_value(reader.decoder())?.into_owned();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// WordprocessingML main namespace, transitional and strict.
const WORDML_NAMESPACES: &[&[u8]] = &[
    b"http://schemas.openxmlformats.org/wordprocessingml/2006/main",
    b"http://purl.oclc.org/ooxml/wordprocessingml/main",
];

fn is_wordml(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => WORDML_NAMESPACES.iter().any(|w| *w == *uri),
        _ => false,
    }
}

/// An element open beneath a body paragraph.
struct Element {
    wordml: bool,
    local: Vec<u8>,
}

impl Element {
    fn is(&self, local: &[u8]) -> bool {
        self.wordml && self.local == local
    }
}

/// A body paragraph being accumulated.
struct OpenParagraph {
    text: String,
    /// Elements open beneath the `w:p`, outermost first.
    open: Vec<Element>,
}

/// A run that contributes paragraph text: a `w:r` child of the paragraph,
/// or a `w:r` child of a `w:hyperlink` child.
fn is_text_run(path: &[Element]) -> bool {
    match path {
        [run] => run.is(b"r"),
        [link, run] => link.is(b"hyperlink") && run.is(b"r"),
        _ => false,
    }
}

fn in_run_text(path: &[Element]) -> bool {
    matches!(path.split_last(), Some((last, run)) if last.is(b"t") && is_text_run(run))
}

/// Text of every direct `w:p` child of `w:body`, in document order.
///
/// Only runs directly under the paragraph or under a direct `w:hyperlink`
/// count; tracked insertions, content controls, fields and text boxes do
/// not. Within a run, `w:t` gives its text, `w:tab` a tab, text-wrapping
/// `w:br` and `w:cr` a newline, and `w:noBreakHyphen` a `-`. Elements are
/// matched by namespace, whatever prefix the package binds to it.
pub(crate) fn body_paragraphs(xml: &[u8]) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(4096);
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut paragraph: Option<OpenParagraph> = None;
    let mut paragraphs = Vec::new();

    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        let wordml = is_wordml(&ns);

        match event {
            Event::Start(ref e) => {
                depth += 1;
                let local = e.local_name();
                if let Some(p) = paragraph.as_mut() {
                    p.open.push(Element {
                        wordml,
                        local: local.as_ref().to_vec(),
                    });
                } else if wordml && local.as_ref() == b"body" && body_depth.is_none() {
                    body_depth = Some(depth);
                } else if wordml
                    && local.as_ref() == b"p"
                    && body_depth.is_some_and(|d| d + 1 == depth)
                {
                    paragraph = Some(OpenParagraph {
                        text: String::new(),
                        open: Vec::new(),
                    });
                }
            }

            Event::Empty(ref e) => {
                let local = e.local_name();
                match paragraph.as_mut() {
                    Some(p) if wordml && is_text_run(&p.open) => match local.as_ref() {
                        b"tab" | b"ptab" => p.text.push('\t'),
                        b"br" if is_text_wrapping_break(e) => p.text.push('\n'),
                        b"cr" => p.text.push('\n'),
                        b"noBreakHyphen" => p.text.push('-'),
                        _ => {}
                    },
                    Some(_) => {}
                    None => {
                        // <w:p/> directly in the body
                        if wordml && local.as_ref() == b"p" && body_depth == Some(depth) {
                            paragraphs.push(String::new());
                        }
                    }
                }
            }

            Event::Text(ref e) => {
                if let Some(p) = paragraph.as_mut()
                    && in_run_text(&p.open)
                {
                    p.text.push_str(&e.unescape()?);
                }
            }

            Event::CData(ref e) => {
                if let Some(p) = paragraph.as_mut()
                    && in_run_text(&p.open)
                {
                    p.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }

            Event::End(_) => {
                let closed = match paragraph.as_mut() {
                    Some(p) => p.open.pop().is_none(),
                    None => false,
                };
                if closed && let Some(p) = paragraph.take() {
                    paragraphs.push(p.text);
                } else if paragraph.is_none() && body_depth == Some(depth) {
                    body_depth = None;
                }
                depth = depth.saturating_sub(1);
            }

            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// `w:br` without a `w:type`, or with `textWrapping`, is a line break;
/// page and column breaks add no text.
fn is_text_wrapping_break(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"type")
        .is_none_or(|a| a.value.as_ref() == b"textWrapping")
}

//! Plain-text extraction from uploaded `.docx` and `.pdf` files.
//!
//! Unrecognized formats are not an error: they are logged and yield empty
//! text, so one stray upload never blocks a chat turn. A recognized format
//! with unreadable contents is reported as [`ChatError::Extraction`].

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use sow_rag::Document;
use tracing::{debug, warn};

use crate::error::{ChatError, Result};

/// Metadata key under which [`load_document`] records the detected format.
pub const FORMAT_METADATA_KEY: &str = "format";

/// Upload formats with a text extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Recognize a format from the file extension, ignoring case.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

/// Extract plain text from an uploaded file's bytes.
///
/// Returns an empty string for unrecognized formats.
///
/// # Errors
///
/// Returns [`ChatError::Extraction`] if a `.docx` or `.pdf` cannot be parsed.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String> {
    let Some(format) = DocumentFormat::from_file_name(file_name) else {
        warn!(file = file_name, "unsupported document format, ignoring contents");
        return Ok(String::new());
    };

    let text = match format {
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::Pdf => extract_pdf(bytes),
    }
    .map_err(|message| {
        warn!(file = file_name, %message, "document extraction failed");
        ChatError::Extraction { file: file_name.to_string(), message }
    })?;

    debug!(file = file_name, ?format, text_len = text.len(), "extracted document text");
    Ok(text)
}

/// Read a file from disk and extract it into a [`Document`] named after the
/// file. Recognized formats are recorded under [`FORMAT_METADATA_KEY`].
pub fn load_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    let text = extract_text(&name, &bytes)?;
    let document = Document::new(name.as_str(), text);
    Ok(match DocumentFormat::from_file_name(&name) {
        Some(format) => document.with_metadata(FORMAT_METADATA_KEY, format.as_str()),
        None => document,
    })
}

/// Text of every non-blank paragraph of `word/document.xml`, one per line.
fn extract_docx(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a docx archive: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("failed to read word/document.xml: {e}"))?;

    Ok(docx_paragraphs(&xml)?.join("\n"))
}

/// Collect the `w:t` text of each `w:p`, in document order of the opening
/// tags. A paragraph nested inside another (text boxes) becomes its own
/// entry and does not cut the outer one short.
fn docx_paragraphs(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    // Indices into `paragraphs` of the open `w:p` elements, innermost last.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| format!("malformed word/document.xml: {e}"))? {
            Event::Start(tag) => match tag.name().as_ref() {
                b"w:p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(tag) => match tag.name().as_ref() {
                b"w:p" => {
                    open.pop();
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Empty(tag) => {
                let Some(&current) = open.last() else { continue };
                match tag.name().as_ref() {
                    b"w:tab" => paragraphs[current].push('\t'),
                    b"w:br" | b"w:cr" => paragraphs[current].push('\n'),
                    _ => {}
                }
            }
            Event::Text(text) if in_text => {
                let Some(&current) = open.last() else { continue };
                let text =
                    text.unescape().map_err(|e| format!("bad text in word/document.xml: {e}"))?;
                paragraphs[current].push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.into_iter().filter(|p| !p.trim().is_empty()).collect())
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("failed to parse pdf: {e}")),
        Err(_) => Err("pdf parser panicked on this file".to_string()),
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> std::result::Result<String, String> {
    warn!("built without the `pdf` feature, ignoring pdf contents");
    Ok(String::new())
}

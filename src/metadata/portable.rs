//! Metadata reader for PDF documents.
//!
//! Reads the document-information dictionary referenced by the trailer's
//! `Info` entry. PDF dates use the `D:YYYYMMDDHHmmSSOHH'mm'` string form;
//! the digit run is split into calendar components and read as the
//! document's own wall-clock time. Any trailing UTC offset is ignored.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::{DocumentMetadata, ExtractError};

#[allow(clippy::expect_used)]
static PDF_DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4,}")
        .expect("PDF date regex is valid") // Static pattern, safe to panic
});

/// Reads author, title and timestamps from the PDF at `path`.
///
/// A document without an information dictionary yields empty metadata.
///
/// # Errors
///
/// Returns [`ExtractError::Pdf`] if the file cannot be parsed as a PDF.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read(path: &Path) -> Result<DocumentMetadata, ExtractError> {
    let document = Document::load(path).map_err(|e| {
        warn!(error = %e, "could not open PDF to read metadata");
        ExtractError::pdf(path, e)
    })?;

    let Some(info) = info_dictionary(&document) else {
        debug!("no document information dictionary");
        return Ok(DocumentMetadata::default());
    };

    let metadata = DocumentMetadata {
        created_by: text_entry(info, b"Author"),
        title: text_entry(info, b"Title"),
        created: date_entry(info, b"CreationDate"),
        modified: date_entry(info, b"ModDate"),
    };
    if metadata.created.is_none() {
        warn!("creation date not found");
    }
    debug!(?metadata, "read document information");
    Ok(metadata)
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text_entry(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

fn date_entry(info: &Dictionary, key: &[u8]) -> Option<DateTime<Utc>> {
    let raw = text_entry(info, key)?;
    let parsed = parse_pdf_date(&raw);
    if parsed.is_none() {
        warn!(key = %String::from_utf8_lossy(key), value = %raw, "unrecognized PDF date");
    }
    parsed
}

/// Decodes a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise UTF-8, falling back to Latin-1.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parses a PDF date string into a UTC-tagged timestamp.
///
/// The first run of at least four digits is read as
/// `YYYY[MM[DD[HH[mm[SS]]]]]`; omitted components default to the start of
/// the period. A trailing `Z` or `+HH'mm'` offset is not applied, so the
/// calendar date is the one written in the document.
pub(crate) fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let digits = PDF_DATE_PATTERN.find(raw)?.as_str();

    let component = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        match digits.get(range) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };

    let year = i32::try_from(component(0..4, 0)?).ok()?;
    let month = component(4..6, 1)?;
    let day = component(6..8, 1)?;
    let hour = component(8..10, 0)?;
    let minute = component(10..12, 0)?;
    let second = component(12..14, 0)?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some(naive.and_utc())
}

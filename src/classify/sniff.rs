//! Content-signature media type detection.
//!
//! The archive cannot be trusted to label what it serves: a missing
//! document comes back as an HTML search page with a success status. Media
//! types are therefore derived from the bytes alone, never from file names
//! or response headers.

use std::fmt;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Legacy binary word-processing format (OLE2 compound file).
pub const LEGACY_WORD: &str = "application/msword";

/// Modern zip-based word-processing package.
pub const MODERN_WORD: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Page-description format.
pub const PDF: &str = "application/pdf";

/// HTML markup, typically an archive redirect page.
pub const HTML: &str = "text/html";

/// Plain text that matched no other signature.
pub const PLAIN_TEXT: &str = "text/plain";

/// Fallback for content nothing recognized.
pub const OCTET_STREAM: &str = "application/octet-stream";

const OLE2_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const WORD_PACKAGE_PART: &str = "word/document.xml";
const TEXT_SAMPLE_LEN: usize = 1024;

/// A media type identifier derived from content inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    /// Wraps a media type string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the legacy binary word-processing format.
    #[must_use]
    pub fn is_legacy_word(&self) -> bool {
        self.0 == LEGACY_WORD
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Determines the media type of `bytes` from their content signature.
///
/// Never fails: content that matches nothing is reported as
/// [`OCTET_STREAM`] (or [`PLAIN_TEXT`] / [`HTML`] for textual content), and
/// rejecting it is left to the caller's allow-list.
#[must_use]
pub fn sniff(bytes: &[u8]) -> MediaType {
    // Checked before `infer`, whose OLE2 sub-typing depends on CLSIDs that
    // converters and older Word versions do not always write.
    if is_legacy_word(bytes) {
        return MediaType::new(LEGACY_WORD);
    }

    if let Some(kind) = infer::get(bytes) {
        let mime = kind.mime_type();
        if mime == "application/zip" && is_word_package(bytes) {
            return MediaType::new(MODERN_WORD);
        }
        return MediaType::new(mime);
    }

    if looks_like_html(bytes) {
        MediaType::new(HTML)
    } else if looks_like_text(bytes) {
        MediaType::new(PLAIN_TEXT)
    } else {
        MediaType::new(OCTET_STREAM)
    }
}

/// Reads the file at `path` and sniffs its content.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn sniff_file(path: &Path) -> io::Result<MediaType> {
    let bytes = fs::read(path)?;
    let media_type = sniff(&bytes);
    debug!(path = %path.display(), media_type = %media_type, bytes = bytes.len(), "sniffed");
    Ok(media_type)
}

/// OLE2 compound file carrying a `WordDocument` stream.
fn is_legacy_word(bytes: &[u8]) -> bool {
    if !bytes.starts_with(&OLE2_SIGNATURE) {
        return false;
    }
    // Directory entry names are stored as UTF-16LE.
    let needle: Vec<u8> = "WordDocument"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    bytes.windows(needle.len()).any(|window| window == needle)
}

/// Zip archive whose central directory lists the main word-processing part.
fn is_word_package(bytes: &[u8]) -> bool {
    match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive.file_names().any(|name| name == WORD_PACKAGE_PART),
        Err(_) => false,
    }
}

fn text_sample(bytes: &[u8]) -> &[u8] {
    let sample = &bytes[..bytes.len().min(TEXT_SAMPLE_LEN)];
    sample.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(sample)
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let sample = text_sample(bytes).trim_ascii_start().to_ascii_lowercase();
    if sample.starts_with(b"<!doctype html") || sample.starts_with(b"<html") {
        return true;
    }
    let tags: [&[u8]; 3] = [b"<html", b"<head", b"<body"];
    tags.iter()
        .any(|tag| sample.windows(tag.len()).any(|window| window == *tag))
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let sample = text_sample(bytes);
    !sample.is_empty() && !sample.contains(&0) && std::str::from_utf8(sample).is_ok()
}

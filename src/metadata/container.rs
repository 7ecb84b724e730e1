//! Metadata reader for zip-based document packages.
//!
//! Package metadata lives in the `docProps/core.xml` part:
//!
//! ```xml
//! <cp:coreProperties
//!     xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
//!     xmlns:dc="http://purl.org/dc/elements/1.1/"
//!     xmlns:dcterms="http://purl.org/dc/terms/">
//!   <dc:creator>Alice</dc:creator>
//!   <dc:title>Brief</dc:title>
//!   <dcterms:created xsi:type="dcterms:W3CDTF">2021-05-01T10:00:00Z</dcterms:created>
//! </cp:coreProperties>
//! ```
//!
//! Elements are matched by namespace URI and local name, so documents that
//! bind the namespaces to other prefixes read the same.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use super::{DocumentMetadata, ExtractError};

/// Archive entry holding the package's core properties.
pub const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

const DC_NAMESPACE: &[u8] = b"http://purl.org/dc/elements/1.1/";
const DCTERMS_NAMESPACE: &[u8] = b"http://purl.org/dc/terms/";

#[derive(Debug, Clone, Copy)]
enum CoreField {
    Creator,
    Title,
    Created,
    Modified,
}

#[derive(Debug, Default)]
struct CoreProperties {
    creator: Option<String>,
    title: Option<String>,
    created: Option<String>,
    modified: Option<String>,
}

impl CoreProperties {
    fn set(&mut self, field: CoreField, value: String) {
        let slot = match field {
            CoreField::Creator => &mut self.creator,
            CoreField::Title => &mut self.title,
            CoreField::Created => &mut self.created,
            CoreField::Modified => &mut self.modified,
        };
        *slot = Some(value);
    }
}

/// Reads author, title and timestamps from the package at `path`.
///
/// # Errors
///
/// Returns [`ExtractError`] if the file is not a zip archive, has no
/// core-properties part, or that part is not well-formed XML. Absent or
/// unparseable individual fields are left empty instead.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read(path: &Path) -> Result<DocumentMetadata, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::archive(path, e))?;
    let xml = read_core_part(&mut archive, path)?;
    let properties = parse_core_properties(&xml).map_err(|e| ExtractError::xml(path, e))?;

    let metadata = DocumentMetadata {
        created_by: properties.creator,
        title: properties.title,
        created: properties.created.as_deref().and_then(|v| timestamp("created", v)),
        modified: properties
            .modified
            .as_deref()
            .and_then(|v| timestamp("modified", v)),
    };
    debug!(?metadata, "read package core properties");
    Ok(metadata)
}

fn read_core_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
) -> Result<String, ExtractError> {
    let mut entry = match archive.by_name(CORE_PROPERTIES_PART) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ExtractError::missing_entry(path, CORE_PROPERTIES_PART));
        }
        Err(e) => return Err(ExtractError::archive(path, e)),
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::io(path, e))?;
    Ok(xml)
}

fn parse_core_properties(xml: &str) -> Result<CoreProperties, quick_xml::Error> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut properties = CoreProperties::default();
    let mut current: Option<CoreField> = None;

    loop {
        match reader.read_resolved_event()? {
            (ResolveResult::Bound(Namespace(ns)), Event::Start(start)) => {
                current = core_field(ns, start.local_name().as_ref());
            }
            (_, Event::Start(_) | Event::End(_)) => current = None,
            (_, Event::Text(text)) => {
                if let Some(field) = current {
                    let value = text.unescape()?.trim().to_string();
                    if !value.is_empty() {
                        properties.set(field, value);
                    }
                }
            }
            (_, Event::CData(cdata)) => {
                if let Some(field) = current {
                    let value = String::from_utf8_lossy(&cdata).trim().to_string();
                    if !value.is_empty() {
                        properties.set(field, value);
                    }
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    Ok(properties)
}

fn core_field(namespace: &[u8], local_name: &[u8]) -> Option<CoreField> {
    match (namespace, local_name) {
        (DC_NAMESPACE, b"creator") => Some(CoreField::Creator),
        (DC_NAMESPACE, b"title") => Some(CoreField::Title),
        (DCTERMS_NAMESPACE, b"created") => Some(CoreField::Created),
        (DCTERMS_NAMESPACE, b"modified") => Some(CoreField::Modified),
        _ => None,
    }
}

fn timestamp(field: &str, value: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_w3cdtf(value);
    if parsed.is_none() {
        warn!(field, value, "unrecognized timestamp in core properties");
    }
    parsed
}

/// Parses a W3CDTF timestamp and normalizes it to UTC.
///
/// Values without a UTC offset are taken as UTC. Date-only values resolve
/// to midnight.
pub(crate) fn parse_w3cdtf(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

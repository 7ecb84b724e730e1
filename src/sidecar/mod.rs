//! JSON sidecar files for persisted documents.
//!
//! Writes a small machine-readable metadata file (`<id>.json`) next to each
//! persisted document so the extracted author, title and timestamps survive
//! without reopening the document.

use std::fs;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::metadata::DocumentMetadata;

/// Errors produced by sidecar generation.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// I/O error writing the sidecar file to disk.
    #[error("I/O error writing sidecar {path}: {source}")]
    Io {
        /// Sidecar path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// JSON serialization error.
    #[error("JSON serialization error for {path}: {source}")]
    Serialize {
        /// Sidecar path.
        path: PathBuf,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Describes one persisted document.
#[derive(Debug, Clone, Copy)]
pub struct SidecarRecord<'a> {
    /// Zero-padded archive identifier.
    pub document_id: &'a str,
    /// Sniffed media type of the persisted file.
    pub media_type: &'a str,
    /// Extension of the persisted file.
    pub extension: &'a str,
    /// URL the document was fetched from.
    pub source_url: &'a str,
    /// Extracted metadata.
    pub metadata: &'a DocumentMetadata,
}

#[derive(Debug, Serialize)]
struct SidecarDocument<'a> {
    document_id: &'a str,
    media_type: &'a str,
    extension: &'a str,
    source_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

impl<'a> From<&SidecarRecord<'a>> for SidecarDocument<'a> {
    fn from(record: &SidecarRecord<'a>) -> Self {
        let metadata = record.metadata;
        Self {
            document_id: record.document_id,
            media_type: record.media_type,
            extension: record.extension,
            source_url: record.source_url,
            created_by: metadata.created_by.as_deref(),
            title: metadata.title.as_deref(),
            created: metadata.created.as_ref().map(rfc3339),
            modified: metadata.modified.as_ref().map(rfc3339),
        }
    }
}

fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Writes the sidecar for `record` next to `document_path`.
///
/// Returns `None` if the sidecar already exists; an existing file is never
/// overwritten.
///
/// # Errors
///
/// Returns [`SidecarError`] on I/O or serialization failure. A partially
/// written sidecar is removed first.
#[instrument(skip_all, fields(document_id = record.document_id))]
pub fn write_sidecar(
    record: &SidecarRecord<'_>,
    document_path: &Path,
) -> Result<Option<PathBuf>, SidecarError> {
    let sidecar_path = derive_sidecar_path(document_path);
    let file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&sidecar_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %sidecar_path.display(), "sidecar already exists, skipping");
            return Ok(None);
        }
        Err(source) => {
            return Err(SidecarError::Io {
                path: sidecar_path,
                source,
            });
        }
    };

    let document = SidecarDocument::from(record);
    let write_result = {
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &document)
    };
    if let Err(source) = write_result {
        let _ = fs::remove_file(&sidecar_path);
        return Err(SidecarError::Serialize {
            path: sidecar_path,
            source,
        });
    }

    debug!(path = %sidecar_path.display(), "sidecar created");
    Ok(Some(sidecar_path))
}

/// Removes the sidecar belonging to `document_path`, if there is one.
///
/// Called when the document is replaced so that a sidecar never describes
/// an older copy. Returns whether a file was removed.
///
/// # Errors
///
/// Returns [`SidecarError::Io`] if an existing sidecar cannot be removed.
pub fn remove_sidecar(document_path: &Path) -> Result<bool, SidecarError> {
    let sidecar_path = derive_sidecar_path(document_path);
    match fs::remove_file(&sidecar_path) {
        Ok(()) => {
            debug!(path = %sidecar_path.display(), "stale sidecar removed");
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SidecarError::Io {
            path: sidecar_path,
            source,
        }),
    }
}

/// `00014.pdf` -> `00014.json`
fn derive_sidecar_path(document_path: &Path) -> PathBuf {
    document_path.with_extension("json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            created_by: Some("Alice".to_string()),
            title: Some("Brief".to_string()),
            created: Some(Utc.with_ymd_and_hms(2021, 5, 1, 10, 0, 0).unwrap()),
            modified: None,
        }
    }

    fn record(metadata: &DocumentMetadata) -> SidecarRecord<'_> {
        SidecarRecord {
            document_id: "00014",
            media_type: "application/pdf",
            extension: "pdf",
            source_url: "https://archive.test/d?p=00014",
            metadata,
        }
    }

    #[test]
    fn test_derive_sidecar_path() {
        assert_eq!(
            derive_sidecar_path(Path::new("/dl/00014.pdf")),
            PathBuf::from("/dl/00014.json")
        );
        assert_eq!(
            derive_sidecar_path(Path::new("/dl/00014")),
            PathBuf::from("/dl/00014.json")
        );
    }

    #[test]
    fn test_write_sidecar_contents() {
        let dir = tempfile::tempdir().unwrap();
        let document_path = dir.path().join("00014.pdf");
        std::fs::write(&document_path, b"pdf").unwrap();
        let metadata = metadata();

        let path = write_sidecar(&record(&metadata), &document_path)
            .unwrap()
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["document_id"], "00014");
        assert_eq!(json["media_type"], "application/pdf");
        assert_eq!(json["created_by"], "Alice");
        assert_eq!(json["title"], "Brief");
        assert_eq!(json["created"], "2021-05-01T10:00:00Z");
        assert!(json.get("modified").is_none(), "absent fields are skipped");
    }

    #[test]
    fn test_write_sidecar_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let document_path = dir.path().join("00014.pdf");
        std::fs::write(dir.path().join("00014.json"), b"{\"keep\":true}").unwrap();
        let metadata = metadata();

        let result = write_sidecar(&record(&metadata), &document_path).unwrap();

        assert!(result.is_none());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("00014.json")).unwrap(),
            "{\"keep\":true}"
        );
    }

    #[test]
    fn test_remove_sidecar_then_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let document_path = dir.path().join("00014.pdf");
        std::fs::write(dir.path().join("00014.json"), b"{\"keep\":true}").unwrap();
        let metadata = metadata();

        assert!(remove_sidecar(&document_path).unwrap());
        let path = write_sidecar(&record(&metadata), &document_path)
            .unwrap()
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["document_id"], "00014");
        assert!(json.get("keep").is_none());
    }

    #[test]
    fn test_remove_sidecar_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_sidecar(&dir.path().join("00014.pdf")).unwrap());
    }

    #[test]
    fn test_write_sidecar_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let document_path = dir.path().join("missing").join("00014.pdf");
        let metadata = metadata();

        let err = write_sidecar(&record(&metadata), &document_path).unwrap_err();

        assert!(matches!(err, SidecarError::Io { .. }));
    }
}

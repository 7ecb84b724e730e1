//! Descriptive metadata extraction for accepted document formats.
//!
//! Each format kind has its own reader; [`FormatKind::extract`] dispatches
//! to it. Readers fill every field they can determine and leave the rest
//! empty. Results from different readers are never merged.
//!
//! - [`container`] - zip packages (`docProps/core.xml`)
//! - [`portable`] - PDF document-information dictionary

pub mod container;
mod error;
pub mod portable;

pub use error::ExtractError;

use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Author, title and timestamps of a document.
///
/// Timestamps are normalized to UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Document author.
    pub created_by: Option<String>,
    /// Document title.
    pub title: Option<String>,
    /// Creation timestamp.
    pub created: Option<DateTime<Utc>>,
    /// Last modification timestamp.
    pub modified: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Calendar date of creation.
    #[must_use]
    pub fn created_date(&self) -> Option<NaiveDate> {
        self.created.map(|ts| ts.date_naive())
    }

    /// Calendar date of last modification.
    #[must_use]
    pub fn modified_date(&self) -> Option<NaiveDate> {
        self.modified.map(|ts| ts.date_naive())
    }

    /// Returns true when no field could be determined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created_by.is_none()
            && self.title.is_none()
            && self.created.is_none()
            && self.modified.is_none()
    }
}

/// Family of an accepted format, selecting its metadata reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// Page-description format.
    Pdf,
    /// Zip-based package with a core-properties part.
    ModernDoc,
}

impl FormatKind {
    /// Returns the stable label used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::ModernDoc => "modern_doc",
        }
    }

    /// Reads metadata from `path` with this kind's reader.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the file is not readable as this kind.
    pub fn extract(self, path: &Path) -> Result<DocumentMetadata, ExtractError> {
        match self {
            Self::Pdf => portable::read(path),
            Self::ModernDoc => container::read(path),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

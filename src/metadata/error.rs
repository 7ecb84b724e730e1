//! Error types for metadata extraction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that make a document's metadata unreadable as a whole.
///
/// A field that is merely absent is not an error; it is left empty in
/// [`DocumentMetadata`](super::DocumentMetadata).
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be opened or read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable zip package.
    #[error("invalid package archive {path}: {source}")]
    Archive {
        /// File being read.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A part the package format requires is missing.
    #[error("package {path} has no {entry} part")]
    MissingEntry {
        /// File being read.
        path: PathBuf,
        /// Name of the missing archive entry.
        entry: &'static str,
    },

    /// The core-properties part is not well-formed XML.
    #[error("malformed XML in {path}: {source}")]
    Xml {
        /// File being read.
        path: PathBuf,
        /// The underlying XML error.
        #[source]
        source: quick_xml::Error,
    },

    /// The page-description structure could not be parsed.
    #[error("unreadable PDF {path}: {source}")]
    Pdf {
        /// File being read.
        path: PathBuf,
        /// The underlying PDF error.
        #[source]
        source: lopdf::Error,
    },
}

impl ExtractError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an archive error.
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// Creates a missing-entry error.
    pub fn missing_entry(path: impl Into<PathBuf>, entry: &'static str) -> Self {
        Self::MissingEntry {
            path: path.into(),
            entry,
        }
    }

    /// Creates an XML error.
    pub fn xml(path: impl Into<PathBuf>, source: quick_xml::Error) -> Self {
        Self::Xml {
            path: path.into(),
            source,
        }
    }

    /// Creates a PDF error.
    pub fn pdf(path: impl Into<PathBuf>, source: lopdf::Error) -> Self {
        Self::Pdf {
            path: path.into(),
            source,
        }
    }
}

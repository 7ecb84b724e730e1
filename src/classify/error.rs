//! Error types for the classification pipeline.
//!
//! Only environmental failures live here. Anything wrong with a single
//! document is a [`RejectionReason`](super::RejectionReason), not an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::convert::ConvertError;

/// Failures that abort the whole run rather than skipping one document.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A scratch-space file could not be read.
    #[error("cannot read scratch file {path}: {source}")]
    ScratchIo {
        /// Scratch file that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The legacy converter cannot run at all.
    #[error(transparent)]
    Converter(#[from] ConvertError),
}

impl ClassifyError {
    /// Creates a scratch IO error.
    pub fn scratch_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ScratchIo {
            path: path.into(),
            source,
        }
    }
}

/// Invalid allow-list configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllowListError {
    /// No media type is accepted at all.
    #[error("allow-list is empty; at least one format must be accepted")]
    Empty,

    /// An entry has an empty media type.
    #[error("allow-list entry has an empty media type")]
    EmptyMediaType,

    /// A media type maps to an unusable file extension.
    #[error("invalid extension {extension:?} for media type {media_type}")]
    InvalidExtension {
        /// Media type of the entry.
        media_type: String,
        /// The rejected extension.
        extension: String,
    },

    /// The same media type appears more than once.
    #[error("media type {media_type} is listed more than once")]
    DuplicateMediaType {
        /// The repeated media type.
        media_type: String,
    },

    /// The legacy format must be converted, never accepted directly.
    #[error("legacy media type {media_type} cannot be accepted without conversion")]
    LegacyFormat {
        /// The legacy media type.
        media_type: String,
    },
}

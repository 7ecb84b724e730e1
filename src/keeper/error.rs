//! Error types for the enumeration loop.

use std::path::PathBuf;

use thiserror::Error;

use crate::classify::ClassifyError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::sidecar::SidecarError;

/// Conditions that abort a run.
///
/// Problems with a single document never surface here; they are counted in
/// the [`RunSummary`](super::RunSummary) and the run moves on.
#[derive(Debug, Error)]
pub enum KeeperError {
    /// Configuration could not be turned into a runnable keeper.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The fetch layer failed in a way that affects every document.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Classification failed for environmental reasons.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// A directory the run needs could not be prepared.
    #[error("cannot prepare directory {path}: {source}")]
    Directory {
        /// Directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An accepted document could not be moved into the download directory.
    #[error("cannot persist document to {path}: {source}")]
    Persist {
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The metadata sidecar could not be written.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// A blocking classification task panicked or was cancelled.
    #[error("classification task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl KeeperError {
    /// Creates a directory preparation error.
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    /// Creates a persist error.
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}

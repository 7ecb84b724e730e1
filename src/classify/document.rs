//! Scratch-space staging for documents awaiting classification.
//!
//! A [`RawDocument`] owns exactly one file in scratch space. Dropping it
//! deletes the file; [`RawDocument::persist`] moves the file out of scratch
//! space and disarms the cleanup.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Default zero-padding width the archive uses for document numbers.
pub const DEFAULT_ID_WIDTH: usize = 5;

/// Identifier of one document in the remote archive.
///
/// The archive numbers documents sequentially and addresses them by the
/// zero-padded decimal form (`14` -> `00014`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    number: u64,
    padded: String,
}

impl DocumentId {
    /// Creates an identifier padded to `width` digits.
    #[must_use]
    pub fn new(number: u64, width: usize) -> Self {
        Self {
            number,
            padded: format!("{number:0width$}"),
        }
    }

    /// Creates an identifier with the archive's default padding.
    #[must_use]
    pub fn with_default_width(number: u64) -> Self {
        Self::new(number, DEFAULT_ID_WIDTH)
    }

    /// Returns the numeric document number.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the zero-padded form used in URLs and file names.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.padded
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.padded)
    }
}

/// A downloaded byte stream staged at a scratch-space path.
///
/// The document is owned by whoever holds this value. It is deleted from
/// scratch space on drop unless [`persist`](Self::persist) succeeded.
#[derive(Debug)]
pub struct RawDocument {
    id: String,
    path: PathBuf,
    persisted: bool,
}

impl RawDocument {
    /// Takes ownership of an already-written scratch file.
    #[must_use]
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            persisted: false,
        }
    }

    /// Returns the document identifier this file was staged for.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the scratch-space path of the staged bytes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the staged file to `destination`, consuming the document.
    ///
    /// A plain rename is attempted first; when scratch space and the
    /// destination live on different filesystems the file is copied and the
    /// scratch copy removed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when neither rename nor copy
    /// succeeds. The scratch file is still removed in that case.
    pub fn persist(mut self, destination: &Path) -> io::Result<PathBuf> {
        if let Err(rename_err) = fs::rename(&self.path, destination) {
            debug!(
                error = %rename_err,
                from = %self.path.display(),
                to = %destination.display(),
                "rename failed, falling back to copy"
            );
            fs::copy(&self.path, destination)?;
            if let Err(err) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %err, "could not remove scratch copy");
            }
        }
        self.persisted = true;
        Ok(destination.to_path_buf())
    }
}

impl Drop for RawDocument {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch file removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), error = %err, "could not remove scratch file"),
        }
    }
}

/// Directory used to stage documents between acquisition and placement.
///
/// Every document is staged under its own identifier, so concurrent
/// classifications of distinct documents never share a path.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    _owned: Option<TempDir>,
}

impl ScratchSpace {
    /// Uses (and creates if needed) an explicit scratch directory.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, _owned: None })
    }

    /// Creates a fresh temporary scratch directory, removed on drop.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the temporary directory cannot be created.
    pub fn temporary() -> io::Result<Self> {
        let owned = tempfile::Builder::new().prefix("prkeeper-").tempdir()?;
        Ok(Self {
            dir: owned.path().to_path_buf(),
            _owned: Some(owned),
        })
    }

    /// Returns the scratch directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the staging path for a document identifier.
    #[must_use]
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    /// Writes `bytes` to the staging path for `id`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be written.
    pub fn stage(&self, id: &str, bytes: &[u8]) -> io::Result<RawDocument> {
        let path = self.path_for(id);
        fs::write(&path, bytes)?;
        Ok(RawDocument::new(id, path))
    }
}

//! Conversion of legacy binary documents into the modern container format.
//!
//! The legacy word-processing format is hard to read reliably, so such
//! documents are converted by an external office suite before their metadata
//! is trusted. [`LegacyConverter`] is the seam; [`SofficeConverter`] drives
//! a headless LibreOffice.
//!
//! # Example
//!
//! ```no_run
//! use prkeeper_core::convert::{ConversionResult, LegacyConverter, SofficeConverter};
//! use prkeeper_core::classify::ScratchSpace;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scratch = ScratchSpace::temporary()?;
//! let legacy = scratch.stage("00014", &std::fs::read("appeal.doc")?)?;
//! match SofficeConverter::default().convert(legacy)? {
//!     ConversionResult::Converted(doc) => println!("converted to {}", doc.path().display()),
//!     ConversionResult::Failed => println!("conversion failed"),
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::ConvertError;

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::classify::RawDocument;

/// Default converter executable.
pub const DEFAULT_CONVERTER_PROGRAM: &str = "soffice";

/// Default conversion target format, also the converted file's extension.
pub const DEFAULT_TARGET_FORMAT: &str = "docx";

/// Outcome of a single conversion attempt.
///
/// The input document is consumed by every attempt; on failure it is gone
/// and only the failure marker remains.
#[derive(Debug)]
pub enum ConversionResult {
    /// The converted document, staged next to the consumed input.
    Converted(RawDocument),
    /// The converter ran but did not produce the expected output.
    Failed,
}

/// Converts a legacy binary document into the modern container format.
pub trait LegacyConverter: Send + Sync {
    /// Converts `document`, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] only for environmental problems that make
    /// every future conversion fail too (such as a missing converter
    /// program). Anything specific to this document is reported as
    /// [`ConversionResult::Failed`].
    fn convert(&self, document: RawDocument) -> Result<ConversionResult, ConvertError>;
}

impl<T: LegacyConverter + ?Sized> LegacyConverter for Arc<T> {
    fn convert(&self, document: RawDocument) -> Result<ConversionResult, ConvertError> {
        (**self).convert(document)
    }
}

impl<T: LegacyConverter + ?Sized> LegacyConverter for Box<T> {
    fn convert(&self, document: RawDocument) -> Result<ConversionResult, ConvertError> {
        (**self).convert(document)
    }
}

/// Converter backed by a headless LibreOffice process.
///
/// Runs `<program> --headless --convert-to <format> --outdir <dir> <input>`
/// with all standard streams discarded. The output is expected at
/// `<dir>/<input stem>.<format>`; success is judged by exit status and that
/// file's existence, never by the process's printed output.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
    target_format: String,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_PROGRAM, DEFAULT_TARGET_FORMAT)
    }
}

impl SofficeConverter {
    /// Creates a converter for an explicit program and target format.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, target_format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            target_format: target_format.into(),
        }
    }

    /// Returns the converter program.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the target format passed to `--convert-to`.
    #[must_use]
    pub fn target_format(&self) -> &str {
        &self.target_format
    }

    /// Computes where the converter writes its output for `input`.
    ///
    /// Returns `None` when the input path has no file stem.
    #[must_use]
    pub fn expected_output(&self, input: &Path, output_dir: &Path) -> Option<PathBuf> {
        let stem = input.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(&self.target_format);
        Some(output_dir.join(name))
    }

    fn command(&self, input: &Path, output_dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg(&self.target_format)
            .arg("--outdir")
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl LegacyConverter for SofficeConverter {
    #[instrument(skip_all, fields(document_id = document.id(), input = %document.path().display()))]
    fn convert(&self, document: RawDocument) -> Result<ConversionResult, ConvertError> {
        let output_dir = match document.path().parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(expected) = self.expected_output(document.path(), &output_dir) else {
            warn!("input has no file name; cannot derive conversion output path");
            return Ok(ConversionResult::Failed);
        };
        if expected == document.path() {
            warn!(path = %expected.display(), "conversion output would overwrite its input");
            return Ok(ConversionResult::Failed);
        }

        // A leftover from an earlier attempt must not pass the existence check.
        match std::fs::remove_file(&expected) {
            Ok(()) => debug!(path = %expected.display(), "removed stale conversion output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %expected.display(), error = %e, "could not remove stale conversion output"),
        }

        let mut command = self.command(document.path(), &output_dir);
        debug!(?command, "running converter");

        let status = match command.status() {
            Ok(status) => status,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(program = %self.program.display(), error = %e, "converter program not found");
                return Err(ConvertError::program_not_found(&self.program, e));
            }
            Err(e) => {
                debug!(error = %e, "converter launch error");
                warn!("converting document failed");
                return Ok(ConversionResult::Failed);
            }
        };

        if !status.success() {
            debug!(%status, "converter exited unsuccessfully");
            warn!("converting document failed");
            return Ok(ConversionResult::Failed);
        }

        if !expected.is_file() {
            error!(path = %expected.display(), "converted file not found");
            return Ok(ConversionResult::Failed);
        }

        info!(path = %expected.display(), "document was converted");
        Ok(ConversionResult::Converted(RawDocument::new(
            document.id(),
            expected,
        )))
    }
}

//! Error types for legacy document conversion.

use std::path::PathBuf;

use thiserror::Error;

/// Conversion conditions that indicate a broken environment.
///
/// Per-document conversion failures are not errors; they are reported as
/// [`ConversionResult::Failed`](super::ConversionResult::Failed).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The converter program is not installed or not on `PATH`.
    #[error("converter program {program} not found: {source}")]
    ProgramNotFound {
        /// Program that could not be launched.
        program: PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Creates a program-not-found error.
    pub fn program_not_found(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ProgramNotFound {
            program: program.into(),
            source,
        }
    }
}

//! CLI argument definitions using clap derive macros.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use clap::Parser;

/// END value that leaves the scope open-ended.
pub const OPEN_ENDED_SCOPE: u64 = 0;

/// Archive sequentially numbered public-record documents.
///
/// Fetches each document number in the scope, identifies its real format,
/// converts legacy word-processing files, and keeps accepted documents with
/// their author, title and dates.
#[derive(Parser, Debug)]
#[command(name = "prkeeper")]
#[command(author, version, about)]
pub struct Args {
    /// First and last document number to visit (inclusive); END 0 runs until a stop condition
    #[arg(long, num_args = 2, value_names = ["START", "END"], required = true)]
    pub scope: Vec<u64>,

    /// Path to a TOML config file (default: $XDG_CONFIG_HOME/prkeeper/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for accepted documents (overrides the config file)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Write a JSON metadata sidecar next to each saved document
    #[arg(long)]
    pub sidecar: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Returns the validated document number range.
    ///
    /// An END of [`OPEN_ENDED_SCOPE`] leaves the range unbounded; the run then
    /// ends only when the continuation policy stops it.
    ///
    /// # Errors
    ///
    /// Returns a message when START is greater than a non-zero END.
    pub fn scope_range(&self) -> Result<RangeInclusive<u64>, String> {
        let [start, end] = self.scope[..] else {
            return Err(format!(
                "--scope takes exactly two values, got {}",
                self.scope.len()
            ));
        };
        if end == OPEN_ENDED_SCOPE {
            return Ok(start..=u64::MAX);
        }
        if start > end {
            return Err(format!(
                "invalid --scope: START ({start}) must not be greater than END ({end})"
            ));
        }
        Ok(start..=end)
    }

    /// Default log filter for the verbosity flags.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

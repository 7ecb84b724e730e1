//! Rules deciding when enumeration stops.

use chrono::{DateTime, Utc};

use crate::config::DEFAULT_MAX_CONSECUTIVE_MISSES;
use crate::metadata::DocumentMetadata;

/// When to stop walking the identifier range early.
///
/// The archive numbers documents sequentially, so a run of missing numbers
/// means the end of the published range has been reached. A document
/// created after the run started is also treated as the end: nothing
/// legitimate is dated in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuationPolicy {
    /// Consecutive misses tolerated before stopping.
    pub max_consecutive_misses: u32,
    /// Creation timestamps after this instant stop the run.
    pub reference_time: DateTime<Utc>,
}

impl Default for ContinuationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONSECUTIVE_MISSES, Utc::now())
    }
}

impl ContinuationPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_consecutive_misses: u32, reference_time: DateTime<Utc>) -> Self {
        Self {
            max_consecutive_misses,
            reference_time,
        }
    }

    /// Returns true once `misses` consecutive misses have been seen.
    #[must_use]
    pub fn misses_exhausted(&self, misses: u32) -> bool {
        misses >= self.max_consecutive_misses
    }

    /// Returns true if the document claims to be created after the run began.
    #[must_use]
    pub fn is_future_dated(&self, metadata: &DocumentMetadata) -> bool {
        metadata
            .created
            .is_some_and(|created| created > self.reference_time)
    }
}

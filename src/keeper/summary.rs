//! Counters describing one enumeration run.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::classify::RejectionReason;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Every identifier in the requested range was visited.
    #[default]
    RangeExhausted,
    /// Too many identifiers in a row had no usable document.
    ConsecutiveMisses,
    /// An accepted document was created after the run began.
    FutureDated,
}

impl StopReason {
    /// Returns the stable label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RangeExhausted => "range-exhausted",
            Self::ConsecutiveMisses => "consecutive-misses",
            Self::FutureDated => "future-dated",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics from a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    visited: usize,
    accepted: usize,
    rejected: HashMap<RejectionReason, usize>,
    fetch_failures: usize,
    last_accepted: Option<String>,
    persisted: Vec<PathBuf>,
    stop_reason: StopReason,
}

impl RunSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of identifiers visited.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Returns the number of accepted documents.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Returns the number of documents rejected for `reason`.
    #[must_use]
    pub fn rejected(&self, reason: RejectionReason) -> usize {
        self.rejected.get(&reason).copied().unwrap_or(0)
    }

    /// Returns the number of rejected documents.
    #[must_use]
    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Returns the number of identifiers that could not be fetched.
    #[must_use]
    pub fn fetch_failures(&self) -> usize {
        self.fetch_failures
    }

    /// Returns the identifier of the last accepted document.
    #[must_use]
    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_deref()
    }

    /// Returns where accepted documents were persisted, in order.
    #[must_use]
    pub fn persisted(&self) -> &[PathBuf] {
        &self.persisted
    }

    /// Returns why the run ended.
    #[must_use]
    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    pub(super) fn record_visit(&mut self) {
        self.visited += 1;
    }

    pub(super) fn record_accepted(&mut self, id: &str, path: &Path) {
        self.accepted += 1;
        self.last_accepted = Some(id.to_string());
        self.persisted.push(path.to_path_buf());
    }

    pub(super) fn record_rejected(&mut self, reason: RejectionReason) {
        *self.rejected.entry(reason).or_insert(0) += 1;
    }

    pub(super) fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub(super) fn finish(&mut self, reason: StopReason) {
        self.stop_reason = reason;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_summary_is_empty() {
        let summary = RunSummary::new();
        assert_eq!(summary.visited(), 0);
        assert_eq!(summary.accepted(), 0);
        assert_eq!(summary.total_rejected(), 0);
        assert_eq!(summary.last_accepted(), None);
        assert_eq!(summary.stop_reason(), StopReason::RangeExhausted);
    }

    #[test]
    fn test_rejections_counted_by_reason() {
        let mut summary = RunSummary::new();
        summary.record_rejected(RejectionReason::UnsupportedType);
        summary.record_rejected(RejectionReason::UnsupportedType);
        summary.record_rejected(RejectionReason::ConversionFailed);

        assert_eq!(summary.rejected(RejectionReason::UnsupportedType), 2);
        assert_eq!(summary.rejected(RejectionReason::ConversionFailed), 1);
        assert_eq!(summary.rejected(RejectionReason::UnexpectedFormat), 0);
        assert_eq!(summary.total_rejected(), 3);
    }

    #[test]
    fn test_last_accepted_tracks_latest() {
        let mut summary = RunSummary::new();
        summary.record_accepted("00001", Path::new("/dl/00001.pdf"));
        summary.record_accepted("00003", Path::new("/dl/00003.docx"));

        assert_eq!(summary.accepted(), 2);
        assert_eq!(summary.last_accepted(), Some("00003"));
        assert_eq!(summary.persisted().len(), 2);
    }

    #[test]
    fn test_stop_reason_labels() {
        assert_eq!(StopReason::ConsecutiveMisses.to_string(), "consecutive-misses");
        assert_eq!(StopReason::FutureDated.as_str(), "future-dated");
    }
}

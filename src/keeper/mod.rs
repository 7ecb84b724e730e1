//! Sequential enumeration of the archive.
//!
//! The [`RecordKeeper`] walks a range of document numbers one at a time:
//! fetch into scratch space, classify on the blocking pool, persist accepted
//! documents as `<download_dir>/<id>.<extension>` (plus an optional JSON
//! sidecar), and consult the [`ContinuationPolicy`] to decide whether to go
//! on.
//!
//! # Example
//!
//! ```no_run
//! use prkeeper_core::config::Config;
//! use prkeeper_core::keeper::{ContinuationPolicy, RecordKeeper};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let policy = ContinuationPolicy::new(config.enumeration.max_consecutive_misses, chrono::Utc::now());
//! let keeper = RecordKeeper::from_config(&config, policy)?;
//! let summary = keeper.run(1..=500).await?;
//! println!("accepted {} documents, stopped: {}", summary.accepted(), summary.stop_reason());
//! # Ok(())
//! # }
//! ```

mod error;
mod policy;
mod summary;

pub use error::KeeperError;
pub use policy::ContinuationPolicy;
pub use summary::{RunSummary, StopReason};

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::classify::{
    ClassificationOutcome, DocumentClassifier, DocumentId, RejectionReason, ScratchSpace,
};
use crate::config::Config;
use crate::fetch::ArchiveClient;
use crate::metadata::DocumentMetadata;
use crate::sidecar::{SidecarError, SidecarRecord, remove_sidecar, write_sidecar};

/// What one identifier contributed to the run.
enum Step {
    Accepted { future_dated: bool },
    Miss,
    Skipped,
}

/// Owned sidecar contents, moved onto the blocking pool.
struct SidecarJob {
    document_id: String,
    media_type: String,
    extension: String,
    source_url: String,
    metadata: DocumentMetadata,
}

/// Drops any sidecar left from an earlier copy of the document, then writes
/// a fresh one when enabled.
fn refresh_sidecar(job: Option<SidecarJob>, document_path: &Path) -> Result<(), SidecarError> {
    remove_sidecar(document_path)?;
    if let Some(job) = job {
        let record = SidecarRecord {
            document_id: &job.document_id,
            media_type: &job.media_type,
            extension: &job.extension,
            source_url: &job.source_url,
            metadata: &job.metadata,
        };
        write_sidecar(&record, document_path)?;
    }
    Ok(())
}

/// Drives fetch, classification and persistence over a range of documents.
#[derive(Debug)]
pub struct RecordKeeper {
    client: ArchiveClient,
    classifier: Arc<DocumentClassifier>,
    scratch: ScratchSpace,
    download_dir: PathBuf,
    sidecar: bool,
    policy: ContinuationPolicy,
}

impl RecordKeeper {
    /// Creates a keeper from its collaborators.
    #[must_use]
    pub fn new(
        client: ArchiveClient,
        classifier: DocumentClassifier,
        scratch: ScratchSpace,
        download_dir: impl Into<PathBuf>,
        policy: ContinuationPolicy,
    ) -> Self {
        Self {
            client,
            classifier: Arc::new(classifier),
            scratch,
            download_dir: download_dir.into(),
            sidecar: false,
            policy,
        }
    }

    /// Builds every collaborator from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeeperError`] if the allow-list is invalid, the HTTP client
    /// cannot be built, or the scratch directory cannot be created.
    pub fn from_config(config: &Config, policy: ContinuationPolicy) -> Result<Self, KeeperError> {
        let client = ArchiveClient::new(
            config.archive.base_url.trim(),
            config.archive.connect_timeout_secs,
            config.archive.read_timeout_secs,
        )?
        .with_id_width(config.archive.id_width);
        let classifier = DocumentClassifier::new(config.classifier_config()?, config.converter());
        let scratch = match &config.storage.scratch_dir {
            Some(dir) => ScratchSpace::new(dir).map_err(|e| KeeperError::directory(dir, e))?,
            None => ScratchSpace::temporary()
                .map_err(|e| KeeperError::directory(std::env::temp_dir(), e))?,
        };
        Ok(Self::new(
            client,
            classifier,
            scratch,
            &config.storage.download_dir,
            policy,
        )
        .with_sidecar(config.storage.sidecar))
    }

    /// Enables or disables JSON sidecars.
    #[must_use]
    pub fn with_sidecar(mut self, enabled: bool) -> Self {
        self.sidecar = enabled;
        self
    }

    /// Returns the directory accepted documents are persisted into.
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Processes `range` in ascending order until it is exhausted or the
    /// continuation policy stops the run.
    ///
    /// # Errors
    ///
    /// Returns [`KeeperError`] for environmental failures. Per-document
    /// failures are counted in the returned [`RunSummary`].
    #[instrument(skip_all, fields(start = range.start(), end = range.end()))]
    pub async fn run(&self, range: RangeInclusive<u64>) -> Result<RunSummary, KeeperError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| KeeperError::directory(&self.download_dir, e))?;

        let mut summary = RunSummary::new();
        let mut misses: u32 = 0;
        let mut stop = StopReason::RangeExhausted;

        for number in range {
            let id = self.client.document_id(number);
            summary.record_visit();

            match self.process(&id, &mut summary).await? {
                Step::Accepted { future_dated } => {
                    misses = 0;
                    if future_dated {
                        warn!(document_id = %id, "document is dated after the run started; stopping");
                        stop = StopReason::FutureDated;
                        break;
                    }
                }
                Step::Miss => {
                    misses += 1;
                    debug!(document_id = %id, misses, "miss");
                    if self.policy.misses_exhausted(misses) {
                        info!(misses, "too many consecutive misses; stopping");
                        stop = StopReason::ConsecutiveMisses;
                        break;
                    }
                }
                Step::Skipped => {}
            }
        }

        summary.finish(stop);
        info!(
            visited = summary.visited(),
            accepted = summary.accepted(),
            rejected = summary.total_rejected(),
            fetch_failures = summary.fetch_failures(),
            last_accepted = summary.last_accepted(),
            stop_reason = %summary.stop_reason(),
            "run finished"
        );
        Ok(summary)
    }

    async fn process(&self, id: &DocumentId, summary: &mut RunSummary) -> Result<Step, KeeperError> {
        let raw = match self.client.fetch(id, &self.scratch).await {
            Ok(raw) => raw,
            Err(e) if e.is_per_document() => {
                warn!(document_id = %id, error = %e, "could not fetch document");
                summary.record_fetch_failure();
                return Ok(if e.is_missing_document() {
                    Step::Miss
                } else {
                    Step::Skipped
                });
            }
            Err(e) => return Err(e.into()),
        };

        let classifier = Arc::clone(&self.classifier);
        let outcome = tokio::task::spawn_blocking(move || classifier.classify(raw)).await??;

        match outcome {
            ClassificationOutcome::Accepted {
                extension,
                media_type,
                metadata,
                document,
            } => {
                let destination = self.download_dir.join(format!("{id}.{extension}"));
                let target = destination.clone();
                let persisted = tokio::task::spawn_blocking(move || document.persist(&target))
                    .await?
                    .map_err(|e| KeeperError::persist(&destination, e))?;
                info!(document_id = %id, path = %persisted.display(), "document saved");

                let sidecar = self.sidecar.then(|| SidecarJob {
                    document_id: id.as_str().to_string(),
                    media_type: media_type.as_str().to_string(),
                    extension,
                    source_url: self.client.document_url(id),
                    metadata: metadata.clone(),
                });
                let document_path = persisted.clone();
                tokio::task::spawn_blocking(move || refresh_sidecar(sidecar, &document_path))
                    .await??;

                summary.record_accepted(id.as_str(), &persisted);
                Ok(Step::Accepted {
                    future_dated: self.policy.is_future_dated(&metadata),
                })
            }
            ClassificationOutcome::Rejected { reason } => {
                info!(document_id = %id, %reason, "document rejected");
                summary.record_rejected(reason);
                Ok(if reason == RejectionReason::UnsupportedType {
                    Step::Miss
                } else {
                    Step::Skipped
                })
            }
        }
    }
}

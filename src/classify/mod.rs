//! Document classification pipeline.
//!
//! A [`DocumentClassifier`] takes a [`RawDocument`] sitting in scratch space,
//! sniffs its media type from content, converts legacy binary documents
//! once, checks the result against an [`AllowList`], and reads metadata with
//! the reader the allow-list names. Every document ends in exactly one
//! [`ClassificationOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use prkeeper_core::classify::{ClassificationOutcome, ClassifierConfig, DocumentClassifier, ScratchSpace};
//! use prkeeper_core::convert::SofficeConverter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scratch = ScratchSpace::temporary()?;
//! let raw = scratch.stage("00042", &std::fs::read("download.bin")?)?;
//! let classifier = DocumentClassifier::new(ClassifierConfig::default(), SofficeConverter::default());
//!
//! match classifier.classify(raw)? {
//!     ClassificationOutcome::Accepted { extension, metadata, .. } => {
//!         println!("accepted .{extension}, created {:?}", metadata.created_date());
//!     }
//!     ClassificationOutcome::Rejected { reason } => println!("rejected: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

mod allow_list;
mod document;
mod error;
pub mod sniff;

pub use allow_list::{AllowList, AllowedFormat};
pub use document::{DEFAULT_ID_WIDTH, DocumentId, RawDocument, ScratchSpace};
pub use error::{AllowListError, ClassifyError};
pub use sniff::{MediaType, sniff, sniff_file};

use std::fmt;

use serde::Serialize;
use tracing::{Dispatch, debug, error, info, info_span, warn};

use crate::convert::{ConversionResult, LegacyConverter};
use crate::metadata::{DocumentMetadata, FormatKind};

/// Settings for a [`DocumentClassifier`].
#[derive(Debug, Clone, Default)]
pub struct ClassifierConfig {
    /// Media types accepted after sniffing (and conversion, if needed).
    pub allow_list: AllowList,
}

/// Why a document was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    /// The sniffed media type is not in the allow-list.
    UnsupportedType,
    /// The legacy document could not be converted.
    ConversionFailed,
    /// The converter's output still sniffed as the legacy format.
    UnexpectedFormat,
    /// The metadata reader could not parse the document.
    MetadataExtractionFailed,
}

impl RejectionReason {
    /// All reasons, in reporting order.
    pub const ALL: [Self; 4] = [
        Self::UnsupportedType,
        Self::ConversionFailed,
        Self::UnexpectedFormat,
        Self::MetadataExtractionFailed,
    ];

    /// Returns the kebab-case name used in logs and summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedType => "unsupported-type",
            Self::ConversionFailed => "conversion-failed",
            Self::UnexpectedFormat => "unexpected-format",
            Self::MetadataExtractionFailed => "metadata-extraction-failed",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of classifying one document.
#[derive(Debug)]
pub enum ClassificationOutcome {
    /// The document is in an accepted format and its metadata was read.
    Accepted {
        /// Canonical extension, without the leading dot.
        extension: String,
        /// Media type of the accepted (possibly converted) document.
        media_type: MediaType,
        /// Extracted metadata; individual fields may be absent.
        metadata: DocumentMetadata,
        /// The accepted document, for the caller to persist or drop.
        document: RawDocument,
    },
    /// The document was rejected; its scratch file has been released.
    Rejected {
        /// Why the document was rejected.
        reason: RejectionReason,
    },
}

impl ClassificationOutcome {
    /// Returns true for [`ClassificationOutcome::Accepted`].
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Returns the rejection reason, if rejected.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { reason } => Some(*reason),
        }
    }

    fn rejected(reason: RejectionReason) -> Self {
        Self::Rejected { reason }
    }
}

/// Where a document is in the pipeline. A document is converted at most
/// once; a second legacy sniff ends in rejection.
enum Stage {
    Original(RawDocument),
    Converted(RawDocument),
}

/// Classifies downloaded documents.
///
/// Holds the logging dispatcher that was current when it was built, so
/// diagnostics from a classification land in the same place even when
/// `classify` runs on a blocking worker thread.
pub struct DocumentClassifier {
    config: ClassifierConfig,
    converter: Box<dyn LegacyConverter>,
    dispatch: Dispatch,
}

impl fmt::Debug for DocumentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClassifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DocumentClassifier {
    /// Creates a classifier logging to the current default dispatcher.
    #[must_use]
    pub fn new(config: ClassifierConfig, converter: impl LegacyConverter + 'static) -> Self {
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        Self {
            config,
            converter: Box::new(converter),
            dispatch,
        }
    }

    /// Replaces the logging dispatcher.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Returns the classifier configuration.
    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies one document.
    ///
    /// Rejected documents are removed from scratch space before this
    /// returns. An accepted document travels in the outcome and is removed
    /// when dropped unless the caller persists it.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] only for environmental failures: an
    /// unreadable scratch file or a converter that cannot run.
    pub fn classify(&self, document: RawDocument) -> Result<ClassificationOutcome, ClassifyError> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let span = info_span!("classify", document_id = document.id());
            let _enter = span.enter();
            self.run(document)
        })
    }

    fn run(&self, document: RawDocument) -> Result<ClassificationOutcome, ClassifyError> {
        let mut stage = Stage::Original(document);
        loop {
            let (document, converted) = match stage {
                Stage::Original(document) => (document, false),
                Stage::Converted(document) => (document, true),
            };

            let media_type = sniff_file(document.path())
                .map_err(|e| ClassifyError::scratch_io(document.path(), e))?;
            debug!(%media_type, converted, "sniffed media type");

            if media_type.is_legacy_word() {
                if converted {
                    error!(%media_type, "converted document still has the legacy format");
                    return Ok(ClassificationOutcome::rejected(
                        RejectionReason::UnexpectedFormat,
                    ));
                }
                info!("legacy document; converting");
                match self.converter.convert(document)? {
                    ConversionResult::Converted(output) => {
                        stage = Stage::Converted(output);
                        continue;
                    }
                    ConversionResult::Failed => {
                        return Ok(ClassificationOutcome::rejected(
                            RejectionReason::ConversionFailed,
                        ));
                    }
                }
            }

            let Some(format) = self.config.allow_list.get(&media_type) else {
                warn!(%media_type, "document has an unsupported media type");
                return Ok(ClassificationOutcome::rejected(
                    RejectionReason::UnsupportedType,
                ));
            };
            debug!(extension = %format.extension, "determined extension");

            return Ok(self.extract(document, media_type, &format.extension, format.kind));
        }
    }

    fn extract(
        &self,
        document: RawDocument,
        media_type: MediaType,
        extension: &str,
        kind: FormatKind,
    ) -> ClassificationOutcome {
        match kind.extract(document.path()) {
            Ok(metadata) => {
                info!(
                    %media_type,
                    extension,
                    created_by = metadata.created_by.as_deref(),
                    created = ?metadata.created_date(),
                    "document accepted"
                );
                ClassificationOutcome::Accepted {
                    extension: extension.to_string(),
                    media_type,
                    metadata,
                    document,
                }
            }
            Err(e) => {
                warn!(error = %e, %kind, "metadata extraction failed");
                ClassificationOutcome::rejected(RejectionReason::MetadataExtractionFailed)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write as _;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::convert::ConvertError;

    /// Converter double that writes scripted bytes as its output.
    struct ScriptedConverter {
        output: Mutex<Option<Vec<u8>>>,
        calls: AtomicUsize,
    }

    impl ScriptedConverter {
        fn producing(bytes: Option<Vec<u8>>) -> Self {
            Self {
                output: Mutex::new(bytes),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LegacyConverter for ScriptedConverter {
        fn convert(&self, document: RawDocument) -> Result<ConversionResult, ConvertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some(bytes) = self.output.lock().unwrap().clone() else {
                return Ok(ConversionResult::Failed);
            };
            let path = document.path().with_extension("docx");
            std::fs::write(&path, bytes).unwrap();
            Ok(ConversionResult::Converted(RawDocument::new(document.id(), path)))
        }
    }

    fn legacy_bytes() -> Vec<u8> {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.resize(512, 0);
        bytes.extend("WordDocument".encode_utf16().flat_map(u16::to_le_bytes));
        bytes.resize(1024, 0);
        bytes
    }

    fn docx_bytes(core: Option<&str>) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(b"<w:document/>").unwrap();
        if let Some(core) = core {
            writer.start_file("docProps/core.xml", options).unwrap();
            writer.write_all(core.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
    xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:creator>Alice</dc:creator>
  <dc:title>Brief</dc:title>
  <dcterms:created>2021-05-01T10:00:00Z</dcterms:created>
</cp:coreProperties>"#;

    #[test]
    fn test_rejection_reason_names() {
        let names: Vec<_> = RejectionReason::ALL.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            names,
            [
                "unsupported-type",
                "conversion-failed",
                "unexpected-format",
                "metadata-extraction-failed"
            ]
        );
    }

    #[test]
    fn test_modern_document_accepted_without_conversion() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch.stage("00001", &docx_bytes(Some(CORE))).unwrap();
        let converter = std::sync::Arc::new(ScriptedConverter::producing(None));
        let classifier = DocumentClassifier::new(ClassifierConfig::default(), converter.clone());

        let outcome = classifier.classify(raw).unwrap();

        let ClassificationOutcome::Accepted { extension, metadata, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(extension, "docx");
        assert_eq!(metadata.created_by.as_deref(), Some("Alice"));
        assert_eq!(converter.calls(), 0);
    }

    #[test]
    fn test_legacy_document_converted_once() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch.stage("00002", &legacy_bytes()).unwrap();
        let converter =
            std::sync::Arc::new(ScriptedConverter::producing(Some(docx_bytes(Some(CORE)))));
        let classifier = DocumentClassifier::new(ClassifierConfig::default(), converter.clone());

        let outcome = classifier.classify(raw).unwrap();

        assert!(outcome.is_accepted(), "expected acceptance, got {outcome:?}");
        assert_eq!(converter.calls(), 1);
    }

    #[test]
    fn test_converter_output_still_legacy_is_unexpected_format() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch.stage("00003", &legacy_bytes()).unwrap();
        let converter = std::sync::Arc::new(ScriptedConverter::producing(Some(legacy_bytes())));
        let classifier = DocumentClassifier::new(ClassifierConfig::default(), converter.clone());

        let outcome = classifier.classify(raw).unwrap();

        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::UnexpectedFormat)
        );
        assert_eq!(converter.calls(), 1);
    }

    #[test]
    fn test_failed_conversion_rejected() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch.stage("00004", &legacy_bytes()).unwrap();
        let classifier =
            DocumentClassifier::new(ClassifierConfig::default(), ScriptedConverter::producing(None));

        let outcome = classifier.classify(raw).unwrap();

        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::ConversionFailed)
        );
    }

    #[test]
    fn test_unsupported_type_rejected_and_removed() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch
            .stage("00005", b"<!DOCTYPE html><html><body>Not found</body></html>")
            .unwrap();
        let staged = raw.path().to_path_buf();
        let classifier =
            DocumentClassifier::new(ClassifierConfig::default(), ScriptedConverter::producing(None));

        let outcome = classifier.classify(raw).unwrap();

        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::UnsupportedType)
        );
        assert!(!staged.exists(), "rejected document should be removed");
    }

    #[test]
    fn test_missing_core_properties_rejected() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch.stage("00006", &docx_bytes(None)).unwrap();
        let classifier =
            DocumentClassifier::new(ClassifierConfig::default(), ScriptedConverter::producing(None));

        let outcome = classifier.classify(raw).unwrap();

        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::MetadataExtractionFailed)
        );
    }

    #[test]
    fn test_vanished_scratch_file_is_error() {
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = RawDocument::new("00007", scratch.path_for("00007"));
        let classifier =
            DocumentClassifier::new(ClassifierConfig::default(), ScriptedConverter::producing(None));

        let result = classifier.classify(raw);

        assert!(matches!(result, Err(ClassifyError::ScratchIo { .. })));
    }

    #[test]
    fn test_custom_allow_list_narrows_acceptance() {
        let allow_list = AllowList::from_entries([(
            MediaType::new(sniff::PDF),
            AllowedFormat::new("pdf", FormatKind::Pdf),
        )])
        .unwrap();
        let scratch = ScratchSpace::temporary().unwrap();
        let raw = scratch.stage("00008", &docx_bytes(Some(CORE))).unwrap();
        let classifier = DocumentClassifier::new(
            ClassifierConfig { allow_list },
            ScriptedConverter::producing(None),
        );

        let outcome = classifier.classify(raw).unwrap();

        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::UnsupportedType)
        );
    }
}

//! prkeeper core library
//!
//! Retrieves sequentially numbered public-record documents from a remote
//! archive, works out what each document really is, and keeps the ones in
//! an accepted format together with their author, title and dates.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`classify`] - Content sniffing, allow-list and the classification pipeline
//! - [`convert`] - Legacy word-processing conversion via an external office suite
//! - [`metadata`] - Metadata readers for zip-based packages and PDF
//! - [`fetch`] - HTTP retrieval of archive documents into scratch space
//! - [`keeper`] - Sequential enumeration, persistence and stopping rules
//! - [`sidecar`] - JSON metadata files next to persisted documents
//! - [`config`] - TOML configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod convert;
pub mod fetch;
pub mod keeper;
pub mod metadata;
pub mod sidecar;
mod user_agent;

// Re-export commonly used types
pub use classify::{
    AllowList, AllowedFormat, ClassificationOutcome, ClassifierConfig, ClassifyError,
    DocumentClassifier, DocumentId, MediaType, RawDocument, RejectionReason, ScratchSpace,
};
pub use config::{Config, ConfigError};
pub use convert::{ConversionResult, ConvertError, LegacyConverter, SofficeConverter};
pub use fetch::{ArchiveClient, FetchError};
pub use keeper::{ContinuationPolicy, KeeperError, RecordKeeper, RunSummary, StopReason};
pub use metadata::{DocumentMetadata, ExtractError, FormatKind};

//! Retrieval of archive documents into scratch space.
//!
//! The archive addresses documents by a zero-padded sequential number
//! appended to a base URL. [`ArchiveClient`] streams one document's body
//! into a [`ScratchSpace`](crate::classify::ScratchSpace) file and hands back
//! the owning [`RawDocument`](crate::classify::RawDocument). There is no
//! retry: a failed document is reported and the caller moves on.

mod client;
mod constants;
mod error;

pub use client::ArchiveClient;
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::FetchError;

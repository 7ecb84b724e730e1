//! HTTP client for fetching archive documents into scratch space.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::classify::{DEFAULT_ID_WIDTH, DocumentId, RawDocument, ScratchSpace};
use crate::user_agent;

/// HTTP client bound to one archive base URL.
///
/// Created once per run and reused for every document, taking advantage of
/// connection pooling. A document's URL is the base URL with the
/// zero-padded identifier appended.
///
/// # Example
///
/// ```no_run
/// use prkeeper_core::classify::{DocumentId, ScratchSpace};
/// use prkeeper_core::fetch::ArchiveClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ArchiveClient::new("https://archive.example/Download.aspx?DownloadPath=", 30, 300)?;
/// let scratch = ScratchSpace::temporary()?;
/// let raw = client.fetch(&DocumentId::with_default_width(14), &scratch).await?;
/// println!("staged at {}", raw.path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    base_url: String,
    id_width: usize,
}

impl ArchiveClient {
    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `base_url` does not parse, or
    /// [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|_| FetchError::invalid_url(base_url.clone()))?;
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self {
            client,
            base_url,
            id_width: DEFAULT_ID_WIDTH,
        })
    }

    /// Creates a client with the default timeouts.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_default_timeouts(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::new(base_url, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Sets the zero-padding width of document identifiers.
    #[must_use]
    pub fn with_id_width(mut self, id_width: usize) -> Self {
        self.id_width = id_width;
        self
    }

    /// Returns the configured identifier width.
    #[must_use]
    pub fn id_width(&self) -> usize {
        self.id_width
    }

    /// Builds the identifier for a document number at this archive's width.
    #[must_use]
    pub fn document_id(&self, number: u64) -> DocumentId {
        DocumentId::new(number, self.id_width)
    }

    /// Returns the download URL for a document.
    #[must_use]
    pub fn document_url(&self, id: &DocumentId) -> String {
        format!("{}{}", self.base_url, id.as_str())
    }

    /// Downloads one document into `scratch/<padded id>`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::HttpStatus`], [`FetchError::Network`] or
    /// [`FetchError::Timeout`] for failures specific to this document, and
    /// [`FetchError::Io`] when scratch space cannot be written. A partially
    /// written scratch file is removed before returning an error.
    #[instrument(skip_all, fields(document_id = %id))]
    pub async fn fetch(
        &self,
        id: &DocumentId,
        scratch: &ScratchSpace,
    ) -> Result<RawDocument, FetchError> {
        let url = self.document_url(id);
        debug!(url = %url, "fetching document");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(&url)
            } else {
                FetchError::network(&url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "archive returned error status");
            return Err(FetchError::http_status(&url, status.as_u16()));
        }

        let file_path = scratch.path_for(id.as_str());
        let mut file = File::create(&file_path)
            .await
            .map_err(|e| FetchError::io(file_path.clone(), e))?;

        let stream_result = stream_to_file(&mut file, response, &url, &file_path).await;
        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }
        let bytes = stream_result?;

        info!(path = %file_path.display(), bytes, "document fetched");
        Ok(RawDocument::new(id.as_str(), file_path))
    }
}

/// Streams the response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_fetch_user_agent())
        .build()
}

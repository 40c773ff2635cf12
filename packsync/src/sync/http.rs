//! HTTP object transfer with a trait seam for testing.
//!
//! The orchestrator only cares about "stream this URL into this file and
//! tell me how it failed", so that is the whole trait. Timeouts are
//! distinguished from every other failure because only timeouts are
//! retried.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

/// How a single transfer attempt failed.
#[derive(Debug)]
pub enum FetchError {
    /// The request or body read timed out. Counts one attempt; retryable.
    Timeout,

    /// The server answered with a non-success status. Not retried.
    Status { code: u16 },

    /// Any other network-level failure. Not retried.
    Network { reason: String },

    /// Writing the destination file failed. Not retried.
    Write { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Status { code } => write!(f, "server returned status {}", code),
            Self::Network { reason } => write!(f, "network error: {}", reason),
            Self::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Boxed future returned by [`ObjectFetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<u64, FetchError>> + Send + 'a>>;

/// Streams one remote object into a local file.
///
/// The trait seam allows tests to substitute a mock and drive the
/// orchestrator without a network.
pub trait ObjectFetcher: Send + Sync + 'static {
    /// Fetch `url` into `dest`, overwriting any existing content.
    ///
    /// Returns the number of bytes written. The destination's parent
    /// directory is guaranteed to exist by the caller.
    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> FetchFuture<'a>;
}

/// Real fetcher backed by reqwest, streaming the body to disk.
#[derive(Debug)]
pub struct HttpObjectFetcher {
    client: reqwest::Client,
}

impl HttpObjectFetcher {
    /// Create a fetcher with the given per-request timeout.
    ///
    /// The timeout covers the whole transfer, so a stalled body read
    /// surfaces as [`FetchError::Timeout`] like a stalled connect.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }

    async fn fetch_inner(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::Write {
                path: dest.to_path_buf(),
                source: e,
            })?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify_reqwest_error)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| FetchError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(written)
    }
}

impl ObjectFetcher for HttpObjectFetcher {
    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> FetchFuture<'a> {
        Box::pin(self.fetch_inner(url, dest))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network {
            reason: e.to_string(),
        }
    }
}

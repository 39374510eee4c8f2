//! Error taxonomy for feed fetches and asset downloads.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::http::Retryable;

/// Failure to retrieve or decode release metadata.
///
/// The coordinator turns every variant into a "no update" outcome, but keeps
/// the variant around so callers can tell a dead network from an empty feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unavailable: {0}")]
    Network(#[source] reqwest::Error),
    #[error("feed responded with HTTP {status}")]
    HttpStatus { status: StatusCode },
    #[error("failed to decode feed response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::HttpStatus { status } if *status == StatusCode::NOT_FOUND)
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::HttpStatus { status } => crate::http::is_retryable_status(*status),
            FetchError::Decode(_) => false,
        }
    }
}

/// Failure while downloading a release asset. Every variant reaches the caller.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("release {tag} has no downloadable executable asset")]
    AssetMissing { tag: String },
    #[error(
        "cannot write {}: the file is locked, probably by the running program. Close it and try again",
        .path.display()
    )]
    FileLocked { path: PathBuf },
    #[error("a download to {} is already in progress", .path.display())]
    InProgress { path: PathBuf },
    #[error("server did not report Content-Length for {url}")]
    UnknownLength { url: String },
    #[error("download failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("download responded with HTTP {status}")]
    HttpStatus { status: StatusCode },
    #[error("download interrupted after {received} of {expected} bytes")]
    Interrupted {
        expected: u64,
        received: u64,
        #[source]
        source: Option<reqwest::Error>,
    },
    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

impl Retryable for DownloadError {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Network(_) => true,
            DownloadError::HttpStatus { status } => crate::http::is_retryable_status(*status),
            _ => false,
        }
    }
}

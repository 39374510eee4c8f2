use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::download::ReleaseDownloader;
use crate::feed::FeedClient;
use crate::http::{HttpClient, RetryPolicy};
use crate::release::DEFAULT_ASSET_MARKER;

pub const DEFAULT_CHUNK_SIZE: usize = 8192;
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Network and download settings for the updater.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdaterConfig {
    /// Whole-request bound for feed requests
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    /// Maximum idle time between reads, downloads included
    pub read_timeout: Duration,
    pub max_attempts: usize,
    pub retry_delay: Duration,
    pub chunk_size: usize,
    pub asset_marker: String,
    pub user_agent: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            max_attempts: 1,
            retry_delay: Duration::from_secs(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
            asset_marker: DEFAULT_ASSET_MARKER.to_string(),
            user_agent: format!("ghup/{}", env!("GHUP_VERSION")),
        }
    }
}

impl UpdaterConfig {
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    pub fn with_asset_marker(mut self, marker: impl Into<String>) -> Self {
        self.asset_marker = marker.into();
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: self.retry_delay,
        }
    }

    /// Builds the shared HTTP client. Redirects are followed (reqwest's default
    /// limit of 10), which asset URLs rely on.
    pub fn http_client(&self) -> Result<HttpClient> {
        let client = Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpClient::new(client)
            .with_retry_policy(self.retry_policy())
            .with_fetch_timeout(self.fetch_timeout))
    }

    pub fn feed_client(&self, http: HttpClient) -> FeedClient {
        FeedClient::new(http).with_asset_marker(self.asset_marker.clone())
    }

    pub fn downloader(&self, http: HttpClient) -> ReleaseDownloader {
        ReleaseDownloader::new(http).with_chunk_size(self.chunk_size)
    }
}

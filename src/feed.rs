//! Release feed access.
//!
//! A feed is any endpoint serving GitHub-releases-shaped JSON: a single
//! release object (e.g. `.../releases/latest`) or an array of them
//! (e.g. `.../releases`). Callers pass the full endpoint URL.

use async_trait::async_trait;
use log::{debug, error};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;
use crate::http::{HttpClient, status_hint};
use crate::release::{DEFAULT_ASSET_MARKER, FeedRelease, Release};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            anyhow::bail!("Invalid repository format. Expected 'owner/repo'.")
        } else {
            Ok(RepoId {
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            })
        }
    }
}

/// `{api}/repos/{owner}/{repo}/releases`
pub fn github_releases_url(api_url: &str, repo: &RepoId) -> String {
    format!(
        "{}/repos/{}/{}/releases",
        api_url.trim_end_matches('/'),
        repo.owner,
        repo.repo
    )
}

/// `{api}/repos/{owner}/{repo}/releases/latest`
pub fn github_latest_url(api_url: &str, repo: &RepoId) -> String {
    format!("{}/latest", github_releases_url(api_url, repo))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchReleases: Send + Sync {
    /// Fetches the single release served at `feed_url`.
    async fn latest(&self, feed_url: &str, token: &str) -> Result<Release, FetchError>;

    /// Fetches every release listed at `feed_url`, in feed order.
    async fn all(&self, feed_url: &str, token: &str) -> Result<Vec<Release>, FetchError>;
}

/// Feed fetcher over HTTP.
pub struct FeedClient {
    http: HttpClient,
    asset_marker: String,
}

impl FeedClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            asset_marker: DEFAULT_ASSET_MARKER.to_string(),
        }
    }

    pub fn with_asset_marker(mut self, marker: impl Into<String>) -> Self {
        self.asset_marker = marker.into();
        self
    }

    fn to_release(&self, feed: FeedRelease, token: &str) -> Release {
        Release::from_feed(feed, &self.asset_marker).with_token(token)
    }
}

#[async_trait]
impl FetchReleases for FeedClient {
    #[tracing::instrument(skip(self, token))]
    async fn latest(&self, feed_url: &str, token: &str) -> Result<Release, FetchError> {
        debug!("Fetching latest release from {}...", feed_url);

        match self.http.get_json::<FeedRelease>(feed_url, Some(token)).await {
            Ok(feed) => Ok(self.to_release(feed, token)),
            Err(e) => {
                log_fetch_failure(feed_url, &e);
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self, token))]
    async fn all(&self, feed_url: &str, token: &str) -> Result<Vec<Release>, FetchError> {
        debug!("Fetching release list from {}...", feed_url);

        match self.http.get_json::<Vec<FeedRelease>>(feed_url, Some(token)).await {
            Ok(feeds) => Ok(feeds
                .into_iter()
                .map(|feed| self.to_release(feed, token))
                .collect()),
            Err(e) => {
                log_fetch_failure(feed_url, &e);
                Err(e)
            }
        }
    }
}

fn log_fetch_failure(feed_url: &str, e: &FetchError) {
    match e {
        FetchError::Network(_) => error!(
            "Cannot reach {}, probably no network connection: {}",
            feed_url, e
        ),
        FetchError::HttpStatus { status } => match status_hint(*status) {
            Some(hint) => error!("Request to {} failed: {} ({})", feed_url, e, hint),
            None => error!("Request to {} failed: {}", feed_url, e),
        },
        FetchError::Decode(_) => error!("Unexpected response from {}: {}", feed_url, e),
    }
}

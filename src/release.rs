//! Release metadata as published by a GitHub-releases-shaped feed.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Substring that marks an asset as the executable to install.
pub const DEFAULT_ASSET_MARKER: &str = "exe";

/// Reads a missing or `null` field as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An asset entry in the feed payload. Malformed entries decode as empty
/// rather than failing the whole release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedAsset {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// API URL; with `Accept: application/octet-stream` it redirects to the binary.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub browser_download_url: String,
}

/// One release entry in the feed payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub zipball_url: Option<String>,
    #[serde(default)]
    pub tarball_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prerelease: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub draft: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets: Vec<FeedAsset>,
}

/// The asset chosen for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAsset {
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// A release ready for version comparison and download.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Release {
    /// Version tag (e.g., "v1.2.3")
    pub tag: String,
    /// Release title, when the feed has one
    pub name: Option<String>,
    /// Changelog text
    pub body: String,
    /// Executable asset, `None` when nothing matched the marker
    pub asset: Option<SelectedAsset>,
    /// Source archive URLs (zipball, tarball)
    pub archive_urls: Vec<String>,
    pub html_url: Option<String>,
    pub published_at: Option<String>,
    pub prerelease: bool,
    /// Credentials reused by the downloader; never part of the feed payload
    pub auth_token: Option<String>,
}

impl Release {
    /// Builds a release from its feed entry, selecting the first asset whose
    /// name contains `marker` (case-sensitive).
    pub fn from_feed(feed: FeedRelease, marker: &str) -> Self {
        let asset = feed
            .assets
            .iter()
            .find(|a| a.name.contains(marker))
            .map(|a| SelectedAsset {
                name: a.name.clone(),
                url: if a.url.is_empty() {
                    a.browser_download_url.clone()
                } else {
                    a.url.clone()
                },
                size: a.size,
            });

        let archive_urls = [feed.zipball_url, feed.tarball_url]
            .into_iter()
            .flatten()
            .filter(|u| !u.is_empty())
            .collect();

        Self {
            tag: feed.tag_name,
            name: feed.name,
            body: feed.body.unwrap_or_default(),
            asset,
            archive_urls,
            html_url: feed.html_url,
            published_at: feed.published_at,
            prerelease: feed.prerelease,
            auth_token: None,
        }
    }

    /// Returns the release carrying `token` for later downloads. Empty tokens are dropped.
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    pub fn asset_name(&self) -> Option<&str> {
        self.asset.as_ref().map(|a| a.name.as_str())
    }

    pub fn asset_url(&self) -> Option<&str> {
        self.asset.as_ref().map(|a| a.url.as_str())
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tag: {}", self.tag)?;
        for url in &self.archive_urls {
            writeln!(f, "archive: {}", url)?;
        }
        match &self.asset {
            Some(asset) => {
                writeln!(f, "asset: {}", asset.name)?;
                writeln!(f, "asset url: {}", asset.url)?;
            }
            None => writeln!(f, "asset: (none)")?,
        }
        if !self.body.is_empty() {
            writeln!(f, "changes:\n{}", self.body)?;
        }
        Ok(())
    }
}

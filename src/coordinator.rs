//! Update decision: fetch the latest release and compare it with the running version.

use tracing::{info, warn};

use crate::error::FetchError;
use crate::feed::FetchReleases;
use crate::release::Release;
use crate::version::is_greater;

/// Outcome of one update check.
#[derive(Debug)]
pub enum UpdateCheck {
    /// The feed publishes a newer release.
    Available(Release),
    UpToDate { latest: Release },
    /// The running version is newer than anything published.
    AheadOfRemote { latest: Release },
    /// The feed could not be read; no decision was made.
    Unavailable(FetchError),
}

impl UpdateCheck {
    pub fn is_available(&self) -> bool {
        matches!(self, UpdateCheck::Available(_))
    }

    /// The release to install, if any.
    pub fn into_release(self) -> Option<Release> {
        match self {
            UpdateCheck::Available(release) => Some(release),
            _ => None,
        }
    }
}

pub struct UpdateCoordinator<F: FetchReleases> {
    fetcher: F,
}

impl<F: FetchReleases> UpdateCoordinator<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Checks `feed_url` for a release newer than `current_version`.
    ///
    /// An unparsable tag on either side compares as "not greater" and ends
    /// up as `UpToDate`.
    #[tracing::instrument(skip(self, token))]
    pub async fn check(&self, feed_url: &str, token: &str, current_version: &str) -> UpdateCheck {
        let latest = match self.fetcher.latest(feed_url, token).await {
            Ok(release) => release.with_token(token),
            Err(e) => {
                info!("There are no new releases: {}", e);
                return UpdateCheck::Unavailable(e);
            }
        };

        if is_greater(&latest.tag, current_version) {
            info!(
                "New version {} available (running {})",
                latest.tag, current_version
            );
            UpdateCheck::Available(latest)
        } else if is_greater(current_version, &latest.tag) {
            warn!(
                "Running version {} is newer than the latest published release {}",
                current_version, latest.tag
            );
            UpdateCheck::AheadOfRemote { latest }
        } else {
            info!("Version {} is up to date", current_version);
            UpdateCheck::UpToDate { latest }
        }
    }

    /// Returns the newer release, or `None` when there is nothing to install
    /// or the feed is unavailable.
    pub async fn check_for_updates(
        &self,
        feed_url: &str,
        token: &str,
        current_version: &str,
    ) -> Option<Release> {
        self.check(feed_url, token, current_version)
            .await
            .into_release()
    }

    /// All releases listed at `feed_url`, each carrying `token`.
    pub async fn list_releases(&self, feed_url: &str, token: &str) -> Result<Vec<Release>, FetchError> {
        let releases = self.fetcher.all(feed_url, token).await?;
        info!("Found {} releases at {}", releases.len(), feed_url);
        Ok(releases
            .into_iter()
            .map(|release| release.with_token(token))
            .collect())
    }
}

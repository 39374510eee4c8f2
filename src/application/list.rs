use anyhow::{Context, Result};
use std::io::Write;

use crate::coordinator::UpdateCoordinator;
use crate::feed::FetchReleases;

use super::FeedTarget;

/// Prints every release in the feed, marking the one currently running.
#[tracing::instrument(skip(coordinator, feed, out))]
pub async fn run_list<F: FetchReleases, W: Write>(
    coordinator: &UpdateCoordinator<F>,
    feed: &FeedTarget,
    current_version: &str,
    out: &mut W,
) -> Result<()> {
    let releases = coordinator
        .list_releases(&feed.list_url, &feed.token)
        .await
        .with_context(|| format!("Failed to list releases from {}", feed.list_url))?;

    if releases.is_empty() {
        writeln!(out, "No releases found.")?;
        return Ok(());
    }

    for release in releases {
        let marker = if release.tag.trim_start_matches('v') == current_version.trim_start_matches('v') {
            "*"
        } else {
            " "
        };
        let pre = if release.prerelease { " (pre-release)" } else { "" };
        writeln!(
            out,
            "{} {}{}  {}",
            marker,
            release.tag,
            pre,
            release.asset_name().unwrap_or("-")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::feed::MockFetchReleases;
    use crate::release::{Release, SelectedAsset};
    use reqwest::StatusCode;

    fn feed() -> FeedTarget {
        FeedTarget {
            latest_url: "https://feed/latest".to_string(),
            list_url: "https://feed".to_string(),
            token: String::new(),
        }
    }

    #[tokio::test]
    async fn test_lists_releases_in_feed_order() {
        let mut fetcher = MockFetchReleases::new();
        fetcher.expect_all().returning(|_, _| {
            Ok(vec![
                Release {
                    tag: "v2.0.0-rc1".to_string(),
                    prerelease: true,
                    ..Default::default()
                },
                Release {
                    tag: "v1.0.0".to_string(),
                    asset: Some(SelectedAsset {
                        name: "tool.exe".to_string(),
                        url: "u".to_string(),
                        size: 0,
                    }),
                    ..Default::default()
                },
            ])
        });
        let coordinator = UpdateCoordinator::new(fetcher);
        let mut out = Vec::new();

        run_list(&coordinator, &feed(), "1.0.0", &mut out)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["  v2.0.0-rc1 (pre-release)  -", "* v1.0.0  tool.exe"]);
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let mut fetcher = MockFetchReleases::new();
        fetcher.expect_all().returning(|_, _| Ok(vec![]));
        let coordinator = UpdateCoordinator::new(fetcher);
        let mut out = Vec::new();

        run_list(&coordinator, &feed(), "1.0.0", &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "No releases found.\n");
    }

    #[tokio::test]
    async fn test_failure_is_an_error() {
        let mut fetcher = MockFetchReleases::new();
        fetcher.expect_all().returning(|_, _| {
            Err(FetchError::HttpStatus {
                status: StatusCode::NOT_FOUND,
            })
        });
        let coordinator = UpdateCoordinator::new(fetcher);
        let mut out = Vec::new();

        let err = run_list(&coordinator, &feed(), "1.0.0", &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to list releases"));
    }
}

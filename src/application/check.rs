use anyhow::Result;
use std::io::Write;

use crate::coordinator::{UpdateCheck, UpdateCoordinator};
use crate::feed::FetchReleases;

use super::FeedTarget;

/// Checks for a newer release and reports the outcome.
///
/// An unreachable feed is reported, not returned as an error.
#[tracing::instrument(skip(coordinator, feed, out))]
pub async fn run_check<F: FetchReleases, W: Write>(
    coordinator: &UpdateCoordinator<F>,
    feed: &FeedTarget,
    current_version: &str,
    out: &mut W,
) -> Result<UpdateCheck> {
    let check = coordinator
        .check(&feed.latest_url, &feed.token, current_version)
        .await;
    report(&check, current_version, out)?;
    Ok(check)
}

pub(crate) fn report<W: Write>(check: &UpdateCheck, current_version: &str, out: &mut W) -> Result<()> {
    match check {
        UpdateCheck::Available(release) => {
            writeln!(out, "Update available: {} -> {}", current_version, release.tag)?;
            match release.asset_name() {
                Some(name) => writeln!(out, "   asset: {}", name)?,
                None => writeln!(out, "   no downloadable asset in this release")?,
            }
        }
        UpdateCheck::UpToDate { latest } => {
            writeln!(out, "{} is up to date (latest: {})", current_version, latest.tag)?
        }
        UpdateCheck::AheadOfRemote { latest } => writeln!(
            out,
            "{} is newer than the latest published release {}",
            current_version, latest.tag
        )?,
        UpdateCheck::Unavailable(e) => writeln!(out, "Could not check for updates: {}", e)?,
    }
    Ok(())
}

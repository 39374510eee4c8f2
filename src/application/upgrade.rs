use anyhow::{Context, Result};
use log::info;
use std::io::Write;

use crate::coordinator::{UpdateCheck, UpdateCoordinator};
use crate::download::ReleaseDownloader;
use crate::feed::FetchReleases;
use crate::replace::{ReplacementTarget, SelfReplace};
use crate::runtime::Runtime;

use super::FeedTarget;
use super::check::report;
use super::download::download_with_progress;

#[derive(Debug, Clone, Default)]
pub struct UpgradeOptions {
    /// Skip the confirmation prompt
    pub yes: bool,
    pub show_progress: bool,
}

/// Checks for an update, asks for confirmation, downloads it to a temporary
/// directory and hands it to `replacer`.
///
/// Returns `false` when nothing was installed.
#[tracing::instrument(skip(runtime, coordinator, downloader, replacer, feed, options, out))]
#[allow(clippy::too_many_arguments)]
pub async fn run_upgrade<R: Runtime, F: FetchReleases, S: SelfReplace, W: Write>(
    runtime: &R,
    coordinator: &UpdateCoordinator<F>,
    downloader: ReleaseDownloader,
    replacer: &S,
    feed: &FeedTarget,
    current_version: &str,
    options: &UpgradeOptions,
    out: &mut W,
) -> Result<bool> {
    let check = coordinator
        .check(&feed.latest_url, &feed.token, current_version)
        .await;
    report(&check, current_version, out)?;

    let UpdateCheck::Available(release) = check else {
        return Ok(false);
    };

    writeln!(out, "\n{}", release)?;
    out.flush()?;

    if !options.yes && !runtime.confirm(&format!("Upgrade {} to {}?", current_version, release.tag))? {
        writeln!(out, "Upgrade cancelled.")?;
        return Ok(false);
    }

    let staging = tempfile::Builder::new()
        .prefix("ghup-")
        .tempdir()
        .context("Failed to create a temporary directory")?;
    let downloader = downloader.with_dir(staging.path());

    let path = download_with_progress(&downloader, &release, None, options.show_progress).await?;
    info!("Staged {} at {}", release.tag, path.display());

    writeln!(out, "Installing {}...", release.tag)?;
    out.flush()?;
    replacer.replace_and_restart(&ReplacementTarget::new(path))?;
    Ok(true)
}

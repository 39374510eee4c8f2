use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;

use crate::coordinator::{UpdateCheck, UpdateCoordinator};
use crate::download::ReleaseDownloader;
use crate::feed::FetchReleases;
use crate::release::Release;
use crate::runtime::Runtime;

use super::FeedTarget;
use super::check::report;

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Target directory, created if missing
    pub dir: PathBuf,
    /// Overrides the asset's file name
    pub file_name: Option<String>,
    pub show_progress: bool,
}

/// Checks for an update and downloads its asset when one is available.
///
/// Returns the written path, or `None` when there was nothing to download.
#[tracing::instrument(skip(runtime, coordinator, downloader, feed, options, out))]
pub async fn run_download<R: Runtime, F: FetchReleases, W: Write>(
    runtime: &R,
    coordinator: &UpdateCoordinator<F>,
    downloader: ReleaseDownloader,
    feed: &FeedTarget,
    current_version: &str,
    options: &DownloadOptions,
    out: &mut W,
) -> Result<Option<PathBuf>> {
    let check = coordinator
        .check(&feed.latest_url, &feed.token, current_version)
        .await;
    report(&check, current_version, out)?;

    let UpdateCheck::Available(release) = check else {
        return Ok(None);
    };

    if !options.dir.as_os_str().is_empty() {
        runtime.create_dir_all(&options.dir)?;
    }
    let downloader = downloader.with_dir(&options.dir);

    let path = download_with_progress(
        &downloader,
        &release,
        options.file_name.as_deref(),
        options.show_progress,
    )
    .await?;
    writeln!(out, "Downloaded {} to {}", release.tag, path.display())?;
    Ok(Some(path))
}

/// Downloads `release`, drawing a progress bar when `show_progress` is set.
pub async fn download_with_progress(
    downloader: &ReleaseDownloader,
    release: &Release,
    file_name: Option<&str>,
    show_progress: bool,
) -> Result<PathBuf> {
    let mut session = downloader
        .start(release, file_name)
        .await
        .with_context(|| format!("Failed to download {}", release.tag))?;

    let bar = progress_bar(show_progress, release.asset_name().unwrap_or(&release.tag));
    while let Some(percent) = session
        .next_progress()
        .await
        .with_context(|| format!("Failed to download {}", release.tag))?
    {
        bar.set_position(u64::from(percent));
    }
    bar.finish_and_clear();

    Ok(session.path().to_path_buf())
}

fn progress_bar(enabled: bool, name: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("  {msg} [{bar:30}] {pos}% {elapsed}") {
        bar.set_style(style);
    }
    bar.set_message(name.to_string());
    bar
}

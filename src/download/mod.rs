//! Streaming download of a release's executable asset.
//!
//! Progress is reported as whole percentages. A download either completes
//! with a final `100`, fails with a [`DownloadError`], or is abandoned by
//! dropping the session/stream, which removes the partial file.

mod session;

use futures_util::Stream;
use futures_util::stream;
use log::info;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::release::Release;

pub use session::DownloadSession;
use session::{ActiveClaim, ActiveDownloads, open_exclusive};

pub struct ReleaseDownloader {
    http: HttpClient,
    dir: PathBuf,
    chunk_size: usize,
    active: ActiveDownloads,
}

impl ReleaseDownloader {
    /// Downloads into the current working directory.
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            dir: PathBuf::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            active: ActiveDownloads::default(),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Where `release` would be written: `file_name` if given, otherwise the
    /// asset's own name, inside the downloader's directory.
    pub fn destination(&self, release: &Release, file_name: Option<&str>) -> Result<PathBuf, DownloadError> {
        let name = match file_name {
            Some(name) => name.to_string(),
            None => release
                .asset_name()
                .and_then(safe_file_name)
                .ok_or_else(|| DownloadError::AssetMissing {
                    tag: release.tag.clone(),
                })?,
        };
        Ok(self.dir.join(name))
    }

    /// Opens the asset stream and the destination file.
    ///
    /// Fails with `AssetMissing` before any request when the release has no
    /// selected asset, and with `UnknownLength` before touching the file when
    /// the server does not announce a size.
    #[tracing::instrument(skip(self, release), fields(tag = %release.tag))]
    pub async fn start(&self, release: &Release, file_name: Option<&str>) -> Result<DownloadSession, DownloadError> {
        let asset = release
            .asset
            .as_ref()
            .filter(|a| !a.url.is_empty())
            .ok_or_else(|| DownloadError::AssetMissing {
                tag: release.tag.clone(),
            })?;
        let path = self.destination(release, file_name)?;
        let claim = ActiveClaim::acquire(&self.active, &path)?;

        info!("Downloading {} to {}...", asset.name, path.display());

        let response = self
            .http
            .open_download(&asset.url, release.auth_token.as_deref())
            .await?;

        let total = response
            .content_length()
            .ok_or_else(|| DownloadError::UnknownLength {
                url: asset.url.clone(),
            })?;

        let file = open_exclusive(&path)?;

        Ok(DownloadSession::new(
            response,
            file,
            path,
            total,
            self.chunk_size,
            claim,
        ))
    }

    /// Lazy progress stream for downloading `release`.
    ///
    /// Nothing happens until the stream is polled. Yields non-decreasing
    /// percentages ending with exactly one `100`; errors end the stream.
    pub fn download<'a>(
        &'a self,
        release: &'a Release,
        file_name: Option<&'a str>,
    ) -> impl Stream<Item = Result<u8, DownloadError>> + 'a {
        stream::try_unfold(None, move |session: Option<DownloadSession>| async move {
            let mut session = match session {
                Some(session) => session,
                None => self.start(release, file_name).await?,
            };
            let progress = session.next_progress().await?;
            Ok::<_, DownloadError>(progress.map(|percent| (percent, Some(session))))
        })
    }
}

/// Reduces a feed-supplied asset name to a bare file name.
fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "..")
        .map(str::to_string)
}

use bytes::Bytes;
use log::{debug, info, warn};
use reqwest::Response;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::DownloadError;

/// Destinations currently being written by some session.
pub(crate) type ActiveDownloads = Arc<Mutex<HashSet<PathBuf>>>;

/// Reservation of a destination path, released on drop.
pub(crate) struct ActiveClaim {
    active: ActiveDownloads,
    path: PathBuf,
}

impl ActiveClaim {
    pub(crate) fn acquire(active: &ActiveDownloads, path: &Path) -> Result<Self, DownloadError> {
        let mut set = active.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(path.to_path_buf()) {
            return Err(DownloadError::InProgress {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            active: Arc::clone(active),
            path: path.to_path_buf(),
        })
    }
}

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        let mut set = self.active.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.path);
    }
}

/// State of one in-flight download.
///
/// The session owns the response body and the destination file. Dropping it
/// before completion closes the connection and deletes the partial file.
pub struct DownloadSession {
    response: Response,
    pending: Bytes,
    file: Option<File>,
    path: PathBuf,
    total: u64,
    read: u64,
    chunk_size: usize,
    done: bool,
    complete: bool,
    _claim: ActiveClaim,
}

impl DownloadSession {
    pub(crate) fn new(
        response: Response,
        file: File,
        path: PathBuf,
        total: u64,
        chunk_size: usize,
        claim: ActiveClaim,
    ) -> Self {
        Self {
            response,
            pending: Bytes::new(),
            file: Some(file),
            path,
            total,
            read: 0,
            chunk_size: chunk_size.max(1),
            done: false,
            complete: false,
            _claim: claim,
        }
    }

    /// Size announced by the server's `Content-Length`.
    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Writes the next chunk and returns the completed percentage.
    ///
    /// Returns `Some(100)` exactly once, when the last byte is written, and
    /// `None` on every call after that or after an error.
    pub async fn next_progress(&mut self) -> Result<Option<u8>, DownloadError> {
        if self.done {
            return Ok(None);
        }

        let result = self.advance().await;
        if !matches!(result, Ok(Some(p)) if p < 100) {
            self.done = true;
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<u8>, DownloadError> {
        if self.read >= self.total {
            self.finish()?;
            return Ok(Some(100));
        }

        while self.pending.is_empty() {
            match self.response.chunk().await {
                Ok(Some(chunk)) => self.pending = chunk,
                Ok(None) => {
                    return Err(DownloadError::Interrupted {
                        expected: self.total,
                        received: self.read,
                        source: None,
                    });
                }
                Err(e) => {
                    return Err(DownloadError::Interrupted {
                        expected: self.total,
                        received: self.read,
                        source: Some(e),
                    });
                }
            }
        }

        let len = self.chunk_size.min(self.pending.len());
        let piece = self.pending.split_to(len);
        self.write(&piece)?;
        self.read += len as u64;

        if self.read >= self.total {
            self.finish()?;
            return Ok(Some(100));
        }

        Ok(Some(percent(self.read, self.total)))
    }

    fn write(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.write_all(data)
            .map_err(|e| DownloadError::io("Failed to write", &self.path, e))
    }

    fn finish(&mut self) -> Result<(), DownloadError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .and_then(|_| file.sync_all())
                .map_err(|e| DownloadError::io("Failed to flush", &self.path, e))?;
        }
        self.complete = true;
        info!("Download complete: {} ({} bytes)", self.path.display(), self.read);
        Ok(())
    }
}

impl Drop for DownloadSession {
    fn drop(&mut self) {
        if self.complete {
            return;
        }

        // Close before removing; Windows refuses to delete open files
        self.file.take();
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed incomplete download {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove incomplete download {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

fn percent(read: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((u128::from(read) * 100) / u128::from(total)).min(100) as u8
}

/// Opens `path` for writing, truncating it, without sharing on Windows.
pub(crate) fn open_exclusive(path: &Path) -> Result<File, DownloadError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
    }

    options.open(path).map_err(|e| {
        if is_file_locked(&e, path) {
            DownloadError::FileLocked {
                path: path.to_path_buf(),
            }
        } else {
            DownloadError::io("Failed to open", path, e)
        }
    })
}

/// Whether an open failure means the file is in use by a running program.
#[cfg(unix)]
pub(crate) fn is_file_locked(error: &io::Error, _path: &Path) -> bool {
    error.raw_os_error() == Some(nix::errno::Errno::ETXTBSY as i32)
}

#[cfg(windows)]
pub(crate) fn is_file_locked(error: &io::Error, path: &Path) -> bool {
    const ERROR_ACCESS_DENIED: i32 = 5;
    const ERROR_SHARING_VIOLATION: i32 = 32;
    const ERROR_LOCK_VIOLATION: i32 = 33;

    match error.raw_os_error() {
        Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION) => true,
        Some(ERROR_ACCESS_DENIED) => is_current_exe(path),
        _ => false,
    }
}

#[cfg(not(any(unix, windows)))]
pub(crate) fn is_file_locked(_error: &io::Error, _path: &Path) -> bool {
    false
}

#[cfg(windows)]
fn is_current_exe(path: &Path) -> bool {
    let current = std::env::current_exe().and_then(|p| p.canonicalize());
    let target = path.canonicalize();
    matches!((current, target), (Ok(a), Ok(b)) if a == b)
}

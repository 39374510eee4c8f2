//! Application layer - the CLI use cases.
//!
//! Each flow drives the coordinator and downloader and reports to a writer,
//! so the command layer only parses arguments and picks real implementations.

mod check;
mod download;
mod list;
mod upgrade;

pub use check::run_check;
pub use download::{DownloadOptions, download_with_progress, run_download};
pub use list::run_list;
pub use upgrade::{UpgradeOptions, run_upgrade};

/// Where to look for releases and how to authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedTarget {
    /// Endpoint serving a single release (e.g. `.../releases/latest`)
    pub latest_url: String,
    /// Endpoint serving the release list (e.g. `.../releases`)
    pub list_url: String,
    /// Empty when unauthenticated
    pub token: String,
}

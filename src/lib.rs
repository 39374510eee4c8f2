//! Update checking and self-update for binaries published as GitHub releases.
//!
//! The engine fetches a release feed, compares versions, streams the selected
//! asset to disk with progress, and hands the result to a [`replace::SelfReplace`]
//! implementation.

pub mod application;
pub mod config;
pub mod coordinator;
pub mod download;
pub mod error;
pub mod feed;
pub mod http;
pub mod release;
pub mod replace;
pub mod runtime;
pub mod version;

pub use config::UpdaterConfig;
pub use coordinator::{UpdateCheck, UpdateCoordinator};
pub use download::{DownloadSession, ReleaseDownloader};
pub use error::{DownloadError, FetchError};
pub use feed::{FeedClient, FetchReleases};
pub use release::Release;
pub use version::is_greater;

use anyhow::{Result, bail};
use clap::Parser;
use log::debug;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ghup::application::{self, DownloadOptions, FeedTarget, UpgradeOptions};
use ghup::config::UpdaterConfig;
use ghup::coordinator::UpdateCoordinator;
use ghup::feed::{DEFAULT_API_URL, RepoId, github_latest_url, github_releases_url};
use ghup::http::mask_token;
use ghup::replace::ProcessReplacer;
use ghup::runtime::RealRuntime;

/// ghup - GitHub release updater
///
/// Check a release feed for a newer version, download its executable asset,
/// or upgrade the running binary in place.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for accessing private repositories or avoiding rate limits.
///
/// Examples:
///   ghup check owner/repo --current-version 1.2.0
///   ghup download --feed-url https://example.com/releases/latest --dir ./bin
#[derive(Parser, Debug)]
#[command(author, version = env!("GHUP_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub API URL used with OWNER/REPO
    #[arg(long = "api-url", value_name = "URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Access token sent as `Authorization: token <TOKEN>`
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Version to compare against (defaults to this binary's version)
    #[arg(long = "current-version", value_name = "VERSION", global = true)]
    current_version: Option<String>,

    /// Feed request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30, global = true)]
    timeout: u64,

    /// Retries for transient network failures
    #[arg(long, default_value_t = 0, global = true)]
    retries: usize,

    /// Substring identifying the executable asset
    #[arg(long = "asset-marker", value_name = "TEXT", global = true)]
    asset_marker: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check whether a newer release is available
    Check(FeedArgs),

    /// List all published releases
    List(FeedArgs),

    /// Download the newer release's asset
    Download(DownloadArgs),

    /// Download the newer release and replace the running binary
    Upgrade(UpgradeArgs),
}

#[derive(clap::Args, Debug)]
struct FeedArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO", required_unless_present = "feed_url")]
    repo: Option<String>,

    /// Full URL of a releases/latest style endpoint
    #[arg(long = "feed-url", value_name = "URL", conflicts_with = "repo")]
    feed_url: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DownloadArgs {
    #[command(flatten)]
    feed: FeedArgs,

    /// File name to write instead of the asset name
    #[arg(long, short, value_name = "NAME")]
    output: Option<String>,

    /// Directory to download into
    #[arg(long, value_name = "PATH", default_value = ".")]
    dir: PathBuf,
}

#[derive(clap::Args, Debug)]
struct UpgradeArgs {
    #[command(flatten)]
    feed: FeedArgs,

    /// Do not ask for confirmation
    #[arg(long, short)]
    yes: bool,
}

impl Cli {
    fn config(&self) -> UpdaterConfig {
        let config = UpdaterConfig::default()
            .with_fetch_timeout(Duration::from_secs(self.timeout))
            .with_max_attempts(self.retries.saturating_add(1));
        match &self.asset_marker {
            Some(marker) => config.with_asset_marker(marker.clone()),
            None => config,
        }
    }

    fn current_version(&self) -> String {
        self.current_version
            .clone()
            .unwrap_or_else(|| env!("GHUP_VERSION").to_string())
    }

    fn token(&self) -> String {
        self.token.clone().unwrap_or_default()
    }
}

/// Resolves the latest and list endpoints.
///
/// A `--feed-url` ending in `/latest` lists from its parent.
fn feed_target(args: &FeedArgs, api_url: &str, token: String) -> Result<FeedTarget> {
    let (latest_url, list_url) = match (&args.feed_url, &args.repo) {
        (Some(url), _) => {
            let list = url.strip_suffix("/latest").unwrap_or(url).to_string();
            (url.clone(), list)
        }
        (None, Some(repo)) => {
            let repo: RepoId = repo.parse()?;
            (
                github_latest_url(api_url, &repo),
                github_releases_url(api_url, &repo),
            )
        }
        (None, None) => bail!("Either OWNER/REPO or --feed-url is required"),
    };

    Ok(FeedTarget {
        latest_url,
        list_url,
        token,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = cli.config();
    let token = cli.token();
    if !token.is_empty() {
        debug!("Using token {}", mask_token(&token));
    }
    let current_version = cli.current_version();
    let runtime = RealRuntime;
    let http = config.http_client()?;
    let coordinator = UpdateCoordinator::new(config.feed_client(http.clone()));
    let mut stdout = io::stdout();

    match &cli.command {
        Commands::Check(args) => {
            let feed = feed_target(args, &cli.api_url, token)?;
            application::run_check(&coordinator, &feed, &current_version, &mut stdout).await?;
        }
        Commands::List(args) => {
            let feed = feed_target(args, &cli.api_url, token)?;
            application::run_list(&coordinator, &feed, &current_version, &mut stdout).await?;
        }
        Commands::Download(args) => {
            let feed = feed_target(&args.feed, &cli.api_url, token)?;
            let options = DownloadOptions {
                dir: args.dir.clone(),
                file_name: args.output.clone(),
                show_progress: true,
            };
            application::run_download(
                &runtime,
                &coordinator,
                config.downloader(http),
                &feed,
                &current_version,
                &options,
                &mut stdout,
            )
            .await?;
        }
        Commands::Upgrade(args) => {
            let feed = feed_target(&args.feed, &cli.api_url, token)?;
            let options = UpgradeOptions {
                yes: args.yes,
                show_progress: true,
            };
            application::run_upgrade(
                &runtime,
                &coordinator,
                config.downloader(http),
                &ProcessReplacer,
                &feed,
                &current_version,
                &options,
                &mut stdout,
            )
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_check_parsing() {
        let cli = Cli::try_parse_from(["ghup", "check", "owner/repo"]).unwrap();
        match &cli.command {
            Commands::Check(args) => {
                assert_eq!(args.repo.as_deref(), Some("owner/repo"));
                assert_eq!(args.feed_url, None);
            }
            _ => panic!("Expected Check command"),
        }
        assert_eq!(cli.api_url, DEFAULT_API_URL);
        assert_eq!(cli.timeout, 30);
    }

    #[test]
    fn test_cli_feed_url_parsing() {
        let cli = Cli::try_parse_from([
            "ghup",
            "list",
            "--feed-url",
            "https://example.com/releases",
        ])
        .unwrap();
        match &cli.command {
            Commands::List(args) => {
                assert_eq!(args.feed_url.as_deref(), Some("https://example.com/releases"));
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_cli_requires_a_feed() {
        assert!(Cli::try_parse_from(["ghup", "check"]).is_err());
    }

    #[test]
    fn test_cli_repo_and_feed_url_conflict() {
        let result = Cli::try_parse_from(["ghup", "check", "owner/repo", "--feed-url", "https://x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["ghup", "owner/repo"]).is_err());
    }

    #[test]
    fn test_cli_download_parsing() {
        let cli = Cli::try_parse_from([
            "ghup",
            "download",
            "owner/repo",
            "--output",
            "next.exe",
            "--dir",
            "/tmp/bin",
            "--current-version",
            "1.0.0",
        ])
        .unwrap();
        match &cli.command {
            Commands::Download(args) => {
                assert_eq!(args.output.as_deref(), Some("next.exe"));
                assert_eq!(args.dir, PathBuf::from("/tmp/bin"));
            }
            _ => panic!("Expected Download command"),
        }
        assert_eq!(cli.current_version(), "1.0.0");
    }

    #[test]
    fn test_cli_upgrade_yes() {
        let cli = Cli::try_parse_from(["ghup", "upgrade", "owner/repo", "-y"]).unwrap();
        match &cli.command {
            Commands::Upgrade(args) => assert!(args.yes),
            _ => panic!("Expected Upgrade command"),
        }
    }

    #[test]
    fn test_cli_config() {
        let cli = Cli::try_parse_from([
            "ghup",
            "check",
            "owner/repo",
            "--timeout",
            "5",
            "--retries",
            "2",
            "--asset-marker",
            "linux",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.asset_marker, "linux");
    }

    #[test]
    fn test_feed_target_from_repo() {
        let args = FeedArgs {
            repo: Some("owner/repo".to_string()),
            feed_url: None,
        };
        let feed = feed_target(&args, "https://ghe.example.com/api/v3", "tok".to_string()).unwrap();
        assert_eq!(
            feed.latest_url,
            "https://ghe.example.com/api/v3/repos/owner/repo/releases/latest"
        );
        assert_eq!(
            feed.list_url,
            "https://ghe.example.com/api/v3/repos/owner/repo/releases"
        );
        assert_eq!(feed.token, "tok");
    }

    #[test]
    fn test_feed_target_from_feed_url() {
        let args = FeedArgs {
            repo: None,
            feed_url: Some("https://example.com/releases/latest".to_string()),
        };
        let feed = feed_target(&args, DEFAULT_API_URL, String::new()).unwrap();
        assert_eq!(feed.latest_url, "https://example.com/releases/latest");
        assert_eq!(feed.list_url, "https://example.com/releases");
    }

    #[test]
    fn test_feed_target_invalid_repo() {
        let args = FeedArgs {
            repo: Some("not-a-repo".to_string()),
            feed_url: None,
        };
        assert!(feed_target(&args, DEFAULT_API_URL, String::new()).is_err());
    }
}

//! Hand-off from a finished download to the running process.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The downloaded executable that should take over from the running one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementTarget {
    pub path: PathBuf,
    pub file_name: String,
    /// Arguments for the relaunched process, program name excluded
    pub args: Vec<OsString>,
}

impl ReplacementTarget {
    /// Target for `path`, relaunched without arguments.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait SelfReplace: Send + Sync {
    /// Installs `target` over the running executable and restarts into it.
    ///
    /// Only returns on failure, or where the platform cannot replace the
    /// process image in place.
    fn replace_and_restart(&self, target: &ReplacementTarget) -> Result<()>;
}

/// Swaps the running binary on disk, then relaunches it.
pub struct ProcessReplacer;

impl SelfReplace for ProcessReplacer {
    fn replace_and_restart(&self, target: &ReplacementTarget) -> Result<()> {
        if !target.path.is_file() {
            bail!("Downloaded executable {} does not exist", target.path.display());
        }

        let current = std::env::current_exe().context("Failed to locate the running executable")?;
        make_executable(&target.path)?;

        info!(
            "Replacing {} with {}",
            current.display(),
            target.path.display()
        );
        self_replace::self_replace(&target.path).with_context(|| {
            format!(
                "Failed to replace {} with {}",
                current.display(),
                target.path.display()
            )
        })?;

        relaunch(&current, &target.args)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Replaces the process image, keeping the PID.
#[cfg(unix)]
fn relaunch(exe: &Path, args: &[OsString]) -> Result<()> {
    use std::os::unix::process::CommandExt;

    debug!("exec {} {:?}", exe.display(), args);
    let err = Command::new(exe).args(args).exec();
    Err(err).with_context(|| format!("Failed to restart {}", exe.display()))
}

#[cfg(not(unix))]
fn relaunch(exe: &Path, args: &[OsString]) -> Result<()> {
    debug!("spawn {} {:?}", exe.display(), args);
    Command::new(exe)
        .args(args)
        .spawn()
        .with_context(|| format!("Failed to restart {}", exe.display()))?;
    std::process::exit(0)
}

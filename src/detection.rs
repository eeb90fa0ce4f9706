//! Installation verification
//!
//! Determines whether a working FFmpeg installation is present in two phases:
//! - existence: every binary in [`BINARIES`] is an executable file
//! - health: each binary answers `-version` with exit code zero in time
//!
//! Failures are typed as [`VerifyFailure`] so callers can report them; the
//! platform handlers fold them into a plain `bool`.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use thiserror::Error;

use crate::binaries::{BIN_DIR, BINARIES, VERSION_FLAG};

/// Default time each binary gets to answer `-version`
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why an installation was judged not working
#[derive(Debug, Error)]
pub enum VerifyFailure {
    #[error("FFmpeg installation path is not specified")]
    NoPath,

    #[error("Missing binaries: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Global binary {binary} not found on PATH")]
    NotOnPath { binary: &'static str },

    #[error("Binary {binary} exists but returned {status}")]
    BadExit {
        binary: &'static str,
        status: ExitStatus,
    },

    #[error("Binary {binary} did not answer -version within {}s", .timeout.as_secs_f64())]
    TimedOut {
        binary: &'static str,
        timeout: Duration,
    },

    #[error("Error while executing {binary}: {source}")]
    Launch {
        binary: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Bounded `-version` probe of a single binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheck {
    timeout: Duration,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_TIMEOUT)
    }
}

impl HealthCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program -version` and wait for it, at most `self.timeout`.
    ///
    /// A child still running at the deadline is killed and reaped.
    pub fn probe(&self, program: &Path, binary: &'static str) -> Result<(), VerifyFailure> {
        let mut child = Command::new(program)
            .arg(VERSION_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| VerifyFailure::Launch { binary, source })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => {
                    debug!("{binary} answered {VERSION_FLAG} ({})", program.display());
                    return Ok(());
                }
                Ok(Some(status)) => return Err(VerifyFailure::BadExit { binary, status }),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        reap(&mut child);
                        return Err(VerifyFailure::TimedOut {
                            binary,
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    reap(&mut child);
                    return Err(VerifyFailure::Launch { binary, source });
                }
            }
        }
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Directory holding the binaries for a user-supplied path.
///
/// An install root (containing `bin/`) resolves to its `bin` directory; any
/// other path is taken to be the binary directory itself.
pub fn binary_dir(path: &Path) -> PathBuf {
    let bin = path.join(BIN_DIR);
    if bin.is_dir() { bin } else { path.to_path_buf() }
}

/// Verify the binaries under `path` (an install root or a binary directory)
pub fn verify_dir(path: &Path, health: &HealthCheck) -> Result<(), VerifyFailure> {
    let dir = binary_dir(path);

    let missing: Vec<&'static str> = BINARIES
        .iter()
        .copied()
        .filter(|binary| !is_executable_file(&dir.join(binary)))
        .collect();
    if !missing.is_empty() {
        return Err(VerifyFailure::Missing(missing));
    }

    for &binary in BINARIES {
        health.probe(&dir.join(binary), binary)?;
    }
    Ok(())
}

/// Verify the binaries resolved through the process `PATH`
pub fn verify_on_path(health: &HealthCheck) -> Result<(), VerifyFailure> {
    verify_in_search_path(std::env::var_os("PATH"), health)
}

/// Verify the binaries resolved through an explicit search path
pub fn verify_in_search_path(
    search_path: Option<OsString>,
    health: &HealthCheck,
) -> Result<(), VerifyFailure> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    for &binary in BINARIES {
        let resolved = which::which_in(binary, search_path.as_ref(), &cwd)
            .map_err(|_| VerifyFailure::NotOnPath { binary })?;
        health.probe(&resolved, binary)?;
    }
    Ok(())
}

/// Log a verification outcome and collapse it into a boolean
pub fn report(outcome: Result<(), VerifyFailure>) -> bool {
    match outcome {
        Ok(()) => {
            debug!("FFmpeg installation verified");
            true
        }
        Err(failure) => {
            info!("{failure}");
            false
        }
    }
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o111 != 0
        } else {
            true
        }
    }
}

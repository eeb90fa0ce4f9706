//! Platform detection and per-OS FFmpeg handlers
//!
//! Both handlers are compiled on every target; [`Platform::detect`] is the
//! single place where the host OS picks one.
//!
//! # Module Structure
//!
//! - `linux` - BtbN GPL shared builds, `.tar.xz`
//! - `macos` - ColorsWind shared builds, `.zip`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::binaries::{BIN_DIR, LIB_DIR};
use crate::detection::HealthCheck;
use crate::error::InstallerError;
use crate::extract::{self, ArchiveFormat};
use crate::staging;

mod linux;
mod macos;

pub use linux::LinuxHandler;
pub use macos::MacOsHandler;

/// Supported host operating systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
}

impl Platform {
    /// Detect the current platform from the host OS
    pub fn detect() -> Result<Self, InstallerError> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Result<Self, InstallerError> {
        match os {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            other => Err(InstallerError::UnsupportedPlatform {
                os: other.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            }),
        }
    }

    /// Human-readable OS name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOs => "macOS",
        }
    }

    /// Archive container of this platform's prebuilt distribution
    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Platform::Linux => ArchiveFormat::TarXz,
            Platform::MacOs => ArchiveFormat::Zip,
        }
    }

    /// Build the handler for this platform
    pub fn handler(&self, health: HealthCheck) -> Box<dyn PlatformHandler> {
        match self {
            Platform::Linux => Box::new(LinuxHandler::with_health_check(health)),
            Platform::MacOs => Box::new(MacOsHandler::with_health_check(health)),
        }
    }
}

/// CPU architectures with a prebuilt archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
}

impl Arch {
    /// Normalize a raw architecture name; aliases are matched case-insensitively
    pub fn parse(platform: Platform, raw: &str) -> Result<Self, InstallerError> {
        match raw.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            _ => Err(InstallerError::UnsupportedArchitecture {
                os: platform.name(),
                arch: raw.to_string(),
            }),
        }
    }
}

/// The four-operation contract each OS implements
pub trait PlatformHandler: Send + Sync {
    fn platform(&self) -> Platform;

    /// URL of the prebuilt archive for `arch`
    fn download_url_for(&self, arch: &str) -> Result<String, InstallerError>;

    /// URL of the prebuilt archive for the host architecture
    fn get_download_url(&self) -> Result<String, InstallerError> {
        self.download_url_for(std::env::consts::ARCH)
    }

    /// Extract `download_path` into `install_path/{bin,lib}` and delete the archive
    fn install(&self, download_path: &Path, install_path: &Path) -> Result<(), InstallerError>;

    /// Remove `install_path/bin` and `install_path/lib`
    fn uninstall(&self, install_path: &Path) -> Result<(), InstallerError>;

    /// Whether a working FFmpeg installation is present; never fails
    fn check_installed(&self, path: Option<&Path>) -> bool;
}

/// Shared install flow; only the archive reader differs per platform
pub(crate) fn install_archive(
    format: ArchiveFormat,
    download_path: &Path,
    install_path: &Path,
) -> Result<(), InstallerError> {
    info!("Extracting FFmpeg archive {}...", download_path.display());

    install_archive_inner(format, download_path, install_path).map_err(InstallerError::Install)?;

    info!("FFmpeg installed successfully to {}", install_path.display());
    Ok(())
}

fn install_archive_inner(
    format: ArchiveFormat,
    download_path: &Path,
    install_path: &Path,
) -> Result<()> {
    let scratch_dir = scratch_dir_for(download_path)?;

    extract::extract_payload(download_path, format, &scratch_dir)?;

    let relocated = staging::relocate_payload(&scratch_dir, install_path)?;
    debug!(
        "Relocated {} binaries and {} libraries",
        relocated.binaries.len(),
        relocated.libraries.len()
    );
    // The archive is only consumed once something landed in the install path
    if relocated.binaries.is_empty() && relocated.libraries.is_empty() {
        return Err(InstallerError::NoBinariesFound.into());
    }

    if download_path.exists() {
        fs::remove_file(download_path)
            .with_context(|| format!("Failed to remove archive {}", download_path.display()))?;
    }

    Ok(())
}

/// Extraction happens next to the downloaded archive
fn scratch_dir_for(download_path: &Path) -> Result<PathBuf> {
    match download_path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(PathBuf::from(".")),
        Some(parent) => Ok(parent.to_path_buf()),
        None => bail!("Archive path has no parent directory: {}", download_path.display()),
    }
}

/// Shared uninstall: missing directories are not an error
pub(crate) fn remove_installation(install_path: &Path) -> Result<(), InstallerError> {
    for dir in [BIN_DIR, LIB_DIR] {
        let path = install_path.join(dir);
        if path.exists() {
            fs::remove_dir_all(&path)?;
            debug!("Removed {}", path.display());
        }
    }
    Ok(())
}

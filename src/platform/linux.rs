//! Linux handler: BtbN GPL shared builds packaged as `.tar.xz`.

use std::path::Path;

use super::{Arch, Platform, PlatformHandler, install_archive, remove_installation};
use crate::detection::{self, HealthCheck, VerifyFailure};
use crate::error::InstallerError;
use crate::extract::ArchiveFormat;

const LINUX64_URL: &str = "https://github.com/BtbN/FFmpeg-Builds/releases/download/latest/ffmpeg-master-latest-linux64-gpl-shared.tar.xz";
const LINUXARM64_URL: &str = "https://github.com/BtbN/FFmpeg-Builds/releases/download/latest/ffmpeg-master-latest-linuxarm64-gpl-shared.tar.xz";

#[derive(Debug, Clone, Default)]
pub struct LinuxHandler {
    health: HealthCheck,
}

impl LinuxHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_health_check(health: HealthCheck) -> Self {
        Self { health }
    }
}

impl PlatformHandler for LinuxHandler {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    fn download_url_for(&self, arch: &str) -> Result<String, InstallerError> {
        let url = match Arch::parse(Platform::Linux, arch)? {
            Arch::X86_64 => LINUX64_URL,
            Arch::Arm64 => LINUXARM64_URL,
        };
        Ok(url.to_string())
    }

    fn install(&self, download_path: &Path, install_path: &Path) -> Result<(), InstallerError> {
        install_archive(ArchiveFormat::TarXz, download_path, install_path)
    }

    fn uninstall(&self, install_path: &Path) -> Result<(), InstallerError> {
        remove_installation(install_path)
    }

    /// Linux has no fallback to `PATH`: a path is required
    fn check_installed(&self, path: Option<&Path>) -> bool {
        let outcome = match path {
            Some(path) => detection::verify_dir(path, &self.health),
            None => Err(VerifyFailure::NoPath),
        };
        detection::report(outcome)
    }
}

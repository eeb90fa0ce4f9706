//! macOS handler: ColorsWind shared builds packaged as `.zip`.

use std::ffi::OsString;
use std::path::Path;

use super::{Arch, Platform, PlatformHandler, install_archive, remove_installation};
use crate::detection::{self, HealthCheck};
use crate::error::InstallerError;
use crate::extract::ArchiveFormat;

// Architecture is part of the file name, not the release path
const OSX_X86_64_URL: &str = "https://github.com/ColorsWind/FFmpeg-macOS/releases/download/n5.0.1-patch3/FFmpeg_shared-n5.0.1-OSX-x86_64.zip";
const OSX_ARM64_URL: &str = "https://github.com/ColorsWind/FFmpeg-macOS/releases/download/n5.0.1-patch3/FFmpeg-shared-n5.0.1-OSX-arm64.zip";

#[derive(Debug, Clone, Default)]
pub struct MacOsHandler {
    health: HealthCheck,
    /// Overrides the process `PATH` for `check_installed(None)`
    search_path: Option<OsString>,
}

impl MacOsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_health_check(health: HealthCheck) -> Self {
        Self {
            health,
            search_path: None,
        }
    }

    /// Resolve the tools through `search_path` instead of `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }
}

impl PlatformHandler for MacOsHandler {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn download_url_for(&self, arch: &str) -> Result<String, InstallerError> {
        let url = match Arch::parse(Platform::MacOs, arch)? {
            Arch::X86_64 => OSX_X86_64_URL,
            Arch::Arm64 => OSX_ARM64_URL,
        };
        Ok(url.to_string())
    }

    fn install(&self, download_path: &Path, install_path: &Path) -> Result<(), InstallerError> {
        install_archive(ArchiveFormat::Zip, download_path, install_path)
    }

    fn uninstall(&self, install_path: &Path) -> Result<(), InstallerError> {
        remove_installation(install_path)
    }

    /// Without a path, the binaries are looked up on `PATH`
    fn check_installed(&self, path: Option<&Path>) -> bool {
        let outcome = match path {
            Some(path) => detection::verify_dir(path, &self.health),
            None => match &self.search_path {
                Some(search_path) => {
                    detection::verify_in_search_path(Some(search_path.clone()), &self.health)
                }
                None => detection::verify_on_path(&self.health),
            },
        };
        detection::report(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_zip;

    #[test]
    fn urls_per_architecture() {
        let handler = MacOsHandler::new();
        for arch in ["x86_64", "amd64"] {
            let url = handler.download_url_for(arch).unwrap();
            assert!(url.ends_with("OSX-x86_64.zip"));
        }
        for arch in ["aarch64", "arm64"] {
            let url = handler.download_url_for(arch).unwrap();
            assert!(url.ends_with("OSX-arm64.zip"));
        }
    }

    #[test]
    fn unsupported_architecture() {
        let err = MacOsHandler::new().download_url_for("i386").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported macOS architecture: i386");
    }

    #[test]
    fn install_extracts_payload_and_consumes_archive() {
        let scratch = tempfile::tempdir().unwrap();
        let install = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("FFmpeg-shared-n5.0.1-OSX-arm64.zip");
        write_zip(
            &archive,
            &[
                ("FFmpeg-shared/bin/ffmpeg", b"ffmpeg", 0o644),
                ("FFmpeg-shared/bin/ffplay", b"ffplay", 0o644),
                ("FFmpeg-shared/lib/libavformat.59.dylib", b"format", 0o644),
                ("FFmpeg-shared/share/ffmpeg/examples.txt", b"ex", 0o644),
            ],
        );

        MacOsHandler::new().install(&archive, install.path()).unwrap();

        assert!(!archive.exists());
        assert!(install.path().join("bin/ffmpeg").is_file());
        assert!(install.path().join("bin/ffplay").is_file());
        assert!(install.path().join("lib/libavformat.59.dylib").is_file());
        assert!(!scratch.path().join("FFmpeg-shared/share").exists());
    }

    #[test]
    fn install_that_places_nothing_keeps_archive() {
        use std::fs::File;
        use zip::write::SimpleFileOptions;

        let scratch = tempfile::tempdir().unwrap();
        let install = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("ffmpeg.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        zip.add_directory("FFmpeg-shared/bin/", SimpleFileOptions::default())
            .unwrap();
        zip.finish().unwrap();

        let err = MacOsHandler::new().install(&archive, install.path()).unwrap_err();

        assert!(matches!(err.install_cause(), Some(InstallerError::NoBinariesFound)));
        assert!(archive.exists());
        assert!(!install.path().join("bin").exists());
    }

    #[test]
    fn install_of_missing_archive_is_install_error() {
        let scratch = tempfile::tempdir().unwrap();
        let err = MacOsHandler::new()
            .install(&scratch.path().join("absent.zip"), scratch.path())
            .unwrap_err();

        assert!(matches!(err, InstallerError::Install(_)));
        assert!(err.to_string().starts_with("Failed to install FFmpeg: Failed to open archive"));
    }

    #[cfg(unix)]
    #[test]
    fn broken_binary_is_not_installed() {
        use crate::test_support::{BROKEN, HEALTHY, exec_guard, write_script};

        let _guard = exec_guard();
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "ffmpeg", HEALTHY);
        write_script(dir.path(), "ffprobe", HEALTHY);
        write_script(dir.path(), "ffplay", BROKEN);

        assert!(!MacOsHandler::new().check_installed(Some(dir.path())));
    }

    #[cfg(unix)]
    #[test]
    fn no_path_checks_search_path() {
        use crate::test_support::{BROKEN, HEALTHY, exec_guard, write_healthy_tools, write_script};

        let _guard = exec_guard();
        let healthy = tempfile::tempdir().unwrap();
        let broken = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        write_healthy_tools(healthy.path());
        write_script(broken.path(), "ffmpeg", HEALTHY);
        write_script(broken.path(), "ffprobe", HEALTHY);
        write_script(broken.path(), "ffplay", BROKEN);

        let check = |dir: &Path| {
            MacOsHandler::new()
                .with_search_path(dir.as_os_str())
                .check_installed(None)
        };
        assert!(check(healthy.path()));
        assert!(!check(broken.path()));
        assert!(!check(empty.path()));
    }

    #[test]
    fn missing_path_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!MacOsHandler::new().check_installed(Some(&dir.path().join("nowhere"))));
    }
}

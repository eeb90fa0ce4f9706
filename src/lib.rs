//! Prebuilt FFmpeg installer
//!
//! Resolves the prebuilt FFmpeg archive for the host OS and architecture,
//! installs its executables and shared libraries under an install root,
//! verifies an installation by running each tool, and removes it again.
//!
//! ```no_run
//! use std::path::Path;
//! use local_ffmpeg::{HealthCheck, Platform};
//!
//! # fn main() -> Result<(), local_ffmpeg::InstallerError> {
//! let handler = Platform::detect()?.handler(HealthCheck::default());
//! let url = handler.get_download_url()?;
//! // ... download `url` to /tmp/ffmpeg-dl/archive ...
//! handler.install(Path::new("/tmp/ffmpeg-dl/archive"), Path::new("/opt/ffmpeg"))?;
//! assert!(handler.check_installed(Some(Path::new("/opt/ffmpeg"))));
//! # Ok(())
//! # }
//! ```

pub mod binaries;
pub mod config;
pub mod detection;
pub mod download;
pub mod error;
pub mod extract;
pub mod platform;
pub mod staging;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod test_support;

pub use config::InstallerConfig;
pub use detection::{HealthCheck, VerifyFailure};
pub use error::InstallerError;
pub use extract::ArchiveFormat;
pub use platform::{Arch, LinuxHandler, MacOsHandler, Platform, PlatformHandler};

/// Handler for the host platform
pub fn host_handler(health: HealthCheck) -> Result<Box<dyn PlatformHandler>, InstallerError> {
    Ok(Platform::detect()?.handler(health))
}

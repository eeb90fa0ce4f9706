//! Installer error taxonomy
//!
//! URL resolution and installation report failures through [`InstallerError`].
//! Verification never does: `check_installed` folds every failure into `false`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    /// Host CPU architecture has no prebuilt archive for this OS
    #[error("Unsupported {os} architecture: {arch}")]
    UnsupportedArchitecture { os: &'static str, arch: String },

    /// Host operating system has no handler
    #[error("Unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Archive contained no `bin/` or `lib/` members
    #[error("No FFmpeg binaries found in archive")]
    NoBinariesFound,

    /// Extraction or relocation failed; carries the underlying cause chain
    #[error("Failed to install FFmpeg: {0:#}")]
    Install(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InstallerError {
    /// Borrow the root cause of an install failure, if it is itself an `InstallerError`
    pub fn install_cause(&self) -> Option<&InstallerError> {
        match self {
            InstallerError::Install(cause) => cause.downcast_ref::<InstallerError>(),
            _ => None,
        }
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Install prebuilt FFmpeg binaries for this machine")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Download and install FFmpeg into <DIR>/bin and <DIR>/lib
    Install {
        /// Install root (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Install from an already-downloaded archive instead of downloading.
        /// The archive is extracted next to itself and deleted afterwards.
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Reinstall even if a working installation is present
        #[arg(long)]
        force: bool,
    },
    /// Remove <DIR>/bin and <DIR>/lib
    Uninstall {
        /// Install root (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Verify an installation (Exit 0 = working, 1 = missing or broken)
    Check {
        /// Install root or binary directory (overrides config)
        #[arg(long, conflicts_with = "system")]
        dir: Option<PathBuf>,

        /// Check the binaries found on PATH instead of an install root
        #[arg(long)]
        system: bool,
    },
    /// Print the archive URL for this machine
    Url {
        /// Resolve for this architecture instead of the host's
        #[arg(long)]
        arch: Option<String>,
    },
}

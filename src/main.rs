mod cli;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use tempfile::TempDir;

use local_ffmpeg::{InstallerConfig, PlatformHandler, detection, download, host_handler};

fn main() {
    // RUST_LOG still wins over the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let args = cli::Args::parse();
    let config = InstallerConfig::load(args.config.as_deref())?;

    match args.sub {
        cli::Cmd::Install {
            dir,
            archive,
            force,
        } => run_install(&config, dir.as_deref(), archive, force).await,
        cli::Cmd::Uninstall { dir } => handle_uninstall(&config, dir.as_deref()),
        cli::Cmd::Check { dir, system } => handle_check(&config, dir.as_deref(), system),
        cli::Cmd::Url { arch } => handle_url(&config, arch.as_deref()),
    }
}

/// Download (unless an archive is given), install, then verify
async fn run_install(
    config: &InstallerConfig,
    dir: Option<&Path>,
    archive: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let handler: Arc<dyn PlatformHandler> = Arc::from(host_handler(config.health_check())?);
    let install_dir = config.resolve_install_dir(dir)?;

    if !force && handler.check_installed(Some(&install_dir)) {
        println!("FFmpeg is already installed at {}", install_dir.display());
        return Ok(());
    }

    // Keep the TempDir guard alive until install finishes; dropping it cleans up
    let (archive_path, _scratch) = match archive {
        Some(path) => (path, None),
        None => {
            let url = handler.get_download_url()?;
            let scratch = scratch_dir(config)?;
            let path = download::download_archive(&url, scratch.path(), &config.download).await?;
            (path, Some(scratch))
        }
    };

    info!(
        "Installing FFmpeg for {} into {}",
        handler.platform().name(),
        install_dir.display()
    );

    let verified = {
        let handler = Arc::clone(&handler);
        let install_dir = install_dir.clone();
        tokio::task::spawn_blocking(move || {
            handler.install(&archive_path, &install_dir)?;
            Ok::<_, anyhow::Error>(handler.check_installed(Some(&install_dir)))
        })
        .await
        .context("task join failed")??
    };

    if !verified {
        bail!(
            "FFmpeg was installed to {} but failed verification",
            install_dir.display()
        );
    }

    println!("FFmpeg installed to {}", install_dir.display());
    Ok(())
}

/// Fresh scratch directory for one download
fn scratch_dir(config: &InstallerConfig) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("local-ffmpeg-");

    match &config.download_dir {
        Some(parent) => {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create download directory {}", parent.display())
            })?;
            builder
                .tempdir_in(parent)
                .context("Failed to create scratch directory")
        }
        None => builder.tempdir().context("Failed to create scratch directory"),
    }
}

fn handle_uninstall(config: &InstallerConfig, dir: Option<&Path>) -> Result<()> {
    let handler = host_handler(config.health_check())?;
    let install_dir = config.resolve_install_dir(dir)?;

    handler.uninstall(&install_dir)?;
    println!("FFmpeg removed from {}", install_dir.display());
    Ok(())
}

/// Handle check command (Exit 0 = installed, 1 = not installed)
fn handle_check(config: &InstallerConfig, dir: Option<&Path>, system: bool) -> Result<()> {
    let installed = if system {
        detection::report(detection::verify_on_path(&config.health_check()))
    } else {
        let handler = host_handler(config.health_check())?;
        let install_dir = config.resolve_install_dir(dir)?;
        handler.check_installed(Some(&install_dir))
    };

    if installed {
        println!("FFmpeg is installed");
        Ok(())
    } else {
        println!("FFmpeg is not installed");
        std::process::exit(1);
    }
}

fn handle_url(config: &InstallerConfig, arch: Option<&str>) -> Result<()> {
    let handler = host_handler(config.health_check())?;
    let url = match arch {
        Some(arch) => handler.download_url_for(arch)?,
        None => handler.get_download_url()?,
    };
    println!("{url}");
    Ok(())
}

//! Archive download with progress tracking
//!
//! Streams a prebuilt archive into a scratch directory. The handlers never
//! touch the network; this runs before [`crate::PlatformHandler::install`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use url::Url;

use crate::config::DownloadConfig;

/// File name the archive is saved under: the URL's last path segment
pub fn archive_file_name(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid download URL: {url}"))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Download URL has no file name: {url}"))
}

/// Download `url` into `dest_dir`, returning the archive path
pub async fn download_archive(url: &str, dest_dir: &Path, config: &DownloadConfig) -> Result<PathBuf> {
    let file_name = archive_file_name(url)?;
    let archive_path = dest_dir.join(&file_name);

    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .user_agent(config.user_agent.as_str())
        .build()?;

    info!("Downloading {url}");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {url}"))?;

    if !response.status().is_success() {
        return Err(anyhow!("Download failed for {}: HTTP {}", url, response.status()));
    }

    let total_bytes = response.content_length();
    let progress = progress_bar(total_bytes)?;
    progress.set_message(file_name.clone());

    let mut file = tokio::fs::File::create(&archive_path)
        .await
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    let inactivity = config.inactivity_timeout();

    loop {
        let chunk = match timeout(inactivity, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(e).context("Download interrupted"),
            Ok(None) => break,
            Err(_) => {
                return Err(anyhow!(
                    "Download timeout: No data received for {} seconds while downloading {}. \
                     Downloaded {} bytes. Check network connection and retry.",
                    inactivity.as_secs(),
                    file_name,
                    downloaded
                ));
            }
        };

        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }

    file.flush().await?;
    progress.finish_and_clear();

    if let Some(total) = total_bytes
        && downloaded != total
    {
        return Err(anyhow!(
            "Download of {} incomplete: {}/{} bytes",
            file_name,
            downloaded,
            total
        ));
    }

    info!("Downloaded {} ({} bytes)", archive_path.display(), downloaded);
    Ok(archive_path)
}

fn progress_bar(total_bytes: Option<u64>) -> Result<ProgressBar> {
    let bar = match total_bytes {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("   [{bar:50.green/blue}] {bytes}/{total_bytes}  {msg}")
                    .context("Invalid progress bar template")?
                    .progress_chars("█▓░"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("   {spinner} {bytes}  {msg}")
                    .context("Invalid progress bar template")?,
            );
            bar
        }
    };
    Ok(bar)
}

//! Archive download and extraction.
//!
//! The raw dataset ships as a zip archive behind an HTTP URL. Fetching is
//! idempotent: an archive file already on disk is not re-downloaded, an
//! already-extracted directory is not re-extracted. Network failures
//! propagate to the caller; there is no retry.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::ZipArchive;

/// Downloads and unpacks the dataset archive.
pub struct ArchiveFetcher {
    client: reqwest::blocking::Client,
}

impl ArchiveFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Ensures `dest_dir/extracted_dir` exists, downloading
    /// `dest_dir/archive_name` from `url` first if needed. Returns the path
    /// of the extracted directory.
    pub fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        archive_name: &str,
        extracted_dir: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)
            .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

        let archive_path = dest_dir.join(archive_name);
        let extracted_path = dest_dir.join(extracted_dir);

        if archive_path.is_file() {
            info!(archive = %archive_path.display(), "archive already present, skipping download");
        } else {
            self.download(url, &archive_path)?;
        }

        if extracted_path.is_dir() {
            info!(dir = %extracted_path.display(), "already extracted, skipping");
        } else {
            extract(&archive_path, dest_dir)?;
        }

        Ok(extracted_path)
    }

    fn download(&self, url: &str, archive_path: &Path) -> Result<()> {
        info!(url, "downloading dataset archive");
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .with_context(|| format!("Download failed: {url}"))?;

        let style = ProgressStyle::with_template("{bytes}/{total_bytes} {wide_bar} {eta}")
            .context("Invalid progress bar template")?;
        let bar = match response.content_length() {
            Some(total) => ProgressBar::new(total).with_style(style),
            None => ProgressBar::new_spinner(),
        };

        let mut file = File::create(archive_path)
            .with_context(|| format!("Failed to create {}", archive_path.display()))?;
        io::copy(&mut bar.wrap_read(response), &mut file)
            .with_context(|| format!("Failed to write {}", archive_path.display()))?;
        bar.finish();

        Ok(())
    }
}

impl Default for ArchiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Unpacks a zip archive into `dest_dir`.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    info!(archive = %archive_path.display(), "extracting");
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Not a zip archive: {}", archive_path.display()))?;
    archive
        .extract(dest_dir)
        .with_context(|| format!("Failed to extract into {}", dest_dir.display()))?;
    Ok(())
}

//! Artifact upload.
//!
//! After a run, the model checkpoint and metrics file go to blob storage.
//! [`BlobUploader`] is the narrow interface; the bundled implementation
//! PUTs against an HTTP endpoint. Upload failures propagate without retry.

use anyhow::{ensure, Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

/// Destination for local artifact files.
pub trait BlobUploader {
    /// Uploads `local` under the object name `object`.
    fn upload(&self, local: &Path, object: &str) -> Result<()>;
}

/// Uploads by HTTP PUT to `<endpoint>/<object>`.
pub struct HttpBlobUploader {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpBlobUploader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl BlobUploader for HttpBlobUploader {
    fn upload(&self, local: &Path, object: &str) -> Result<()> {
        let body = fs::read(local)
            .with_context(|| format!("Failed to read artifact: {}", local.display()))?;
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), object);

        self.client
            .put(&url)
            .body(body)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .with_context(|| format!("Upload failed: {url}"))?;

        info!(object, "uploaded artifact");
        Ok(())
    }
}

/// Uploads every file under `dir`, using `prefix/<relative path>` as the
/// object name. Returns the number of files uploaded.
pub fn upload_dir(uploader: &dyn BlobUploader, dir: &Path, prefix: &str) -> Result<usize> {
    ensure!(dir.is_dir(), "Not a directory: {}", dir.display());

    let mut uploaded = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("Path escapes upload root: {}", entry.path().display()))?;
        let object = format!("{}/{}", prefix, relative.display());
        uploader.upload(entry.path(), &object)?;
        uploaded += 1;
    }
    Ok(uploaded)
}

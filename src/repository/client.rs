// src/repository/client.rs

//! HTTP client for remote repositories
//!
//! Thin wrapper around reqwest's blocking client. Downloads are streamed to
//! a temporary file next to the destination and renamed into place, so an
//! interrupted transfer never leaves a truncated artifact in the cache.

use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Maven-layout repositories
pub struct RepositoryClient {
    client: Client,
}

impl RepositoryClient {
    /// Create a new repository client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Download `url` to `dest_path`
    ///
    /// Returns `Ok(false)` when the server answers 404, so callers can try the
    /// next repository. Any other failure is an error. A single attempt is
    /// made.
    pub fn fetch_to_file(&self, url: &Url, dest_path: &Path) -> Result<bool> {
        debug!("Fetching {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to fetch {url}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let parent = dest_path.parent().ok_or_else(|| {
            Error::DownloadError(format!("Invalid destination {}", dest_path.display()))
        })?;
        fs::create_dir_all(parent)?;

        // Write to temporary file first
        let mut temp = NamedTempFile::new_in(parent)?;
        io::copy(&mut response, temp.as_file_mut())
            .map_err(|e| Error::DownloadError(format!("Failed to read {url}: {e}")))?;

        // Atomic rename from temp to final destination
        temp.persist(dest_path).map_err(|e| e.error)?;

        debug!("Downloaded {} to {}", url, dest_path.display());
        Ok(true)
    }
}

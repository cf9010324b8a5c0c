//! Reference document download
//!
//! Crews that answer questions about a document fetch it once, before the
//! pipeline runs: a plain HTTP GET that follows redirects and treats any
//! non-2xx status as a failure. The body is written to the configured path,
//! replacing an existing file.

use crate::config::DocumentSource;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to save {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct DocumentFetcher {
    client: reqwest::Client,
}

impl DocumentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| DownloadError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Download `url` into `path`, returning the number of bytes written
    pub async fn fetch(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        info!(url = %url, path = %path.display(), "Downloading document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DownloadError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DownloadError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| DownloadError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), bytes = bytes.len(), "Document saved");
        Ok(bytes.len() as u64)
    }

    /// Fetch every configured document, stopping at the first failure
    pub async fn fetch_all(&self, documents: &[DocumentSource]) -> Result<(), DownloadError> {
        for document in documents {
            self.fetch(&document.url, &document.path).await?;
        }
        Ok(())
    }
}

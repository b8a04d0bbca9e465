//! Plain HTTP(S) downloads

use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::DownloadError;
use crate::traits::{DownloadDescriptor, Downloader, LocalArtifact};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Streams an HTTP response body to disk
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Create a downloader with the default timeout
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Use a preconfigured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, descriptor: &DownloadDescriptor) -> Result<LocalArtifact, DownloadError> {
        info!(url = %descriptor.url, "downloading");
        let mut response = self.client.get(&descriptor.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: descriptor.url.clone(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = descriptor.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&descriptor.destination).await?;
        let mut size = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url = %descriptor.url, size, "download completed");
        Ok(LocalArtifact {
            source: descriptor.url.clone(),
            path: descriptor.destination.clone(),
            size,
        })
    }
}

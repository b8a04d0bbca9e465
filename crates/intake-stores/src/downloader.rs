//! Store-backed and scheme-routing downloaders

use std::sync::Arc;

use tracing::debug;

use crate::error::DownloadError;
use crate::http::HttpDownloader;
use crate::traits::{DownloadDescriptor, Downloader, LocalArtifact, RemoteStore};

/// Downloads objects out of a [`RemoteStore`]
#[derive(Clone)]
pub struct StoreDownloader {
    store: Arc<dyn RemoteStore>,
}

impl StoreDownloader {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Downloader for StoreDownloader {
    async fn fetch(&self, descriptor: &DownloadDescriptor) -> Result<LocalArtifact, DownloadError> {
        self.store
            .read_to_file(&descriptor.url, &descriptor.destination)
            .await?;
        let size = tokio::fs::metadata(&descriptor.destination).await?.len();
        debug!(url = %descriptor.url, store = self.store.name(), size, "fetched from store");
        Ok(LocalArtifact {
            source: descriptor.url.clone(),
            path: descriptor.destination.clone(),
            size,
        })
    }
}

/// Picks a downloader by URL scheme: `http(s)://` goes over HTTP, every
/// other location is treated as a store URL.
///
/// storage.googleapis.com URLs are store URLs even though they use https.
pub struct RoutingDownloader {
    store: StoreDownloader,
    http: HttpDownloader,
}

impl RoutingDownloader {
    pub fn new(store: Arc<dyn RemoteStore>, http: HttpDownloader) -> Self {
        Self {
            store: StoreDownloader::new(store),
            http,
        }
    }

    fn is_http(url: &str) -> bool {
        (url.starts_with("http://") || url.starts_with("https://"))
            && !url.contains("storage.googleapis.com")
    }
}

#[async_trait::async_trait]
impl Downloader for RoutingDownloader {
    async fn fetch(&self, descriptor: &DownloadDescriptor) -> Result<LocalArtifact, DownloadError> {
        if Self::is_http(&descriptor.url) {
            self.http.fetch(descriptor).await
        } else if descriptor.url.contains("://") && !descriptor.url.starts_with("gs://")
            && !descriptor.url.contains("storage.googleapis.com")
        {
            Err(DownloadError::UnsupportedScheme(descriptor.url.clone()))
        } else {
            self.store.fetch(descriptor).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_downloader_reports_size() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new());
        store.insert("gs://bucket/x/a.csv", "12345").unwrap();

        let downloader = StoreDownloader::new(store);
        let artifact = downloader
            .fetch(&DownloadDescriptor::new(
                "gs://bucket/x/a.csv",
                temp.path().join("a.csv"),
            ))
            .await
            .unwrap();

        assert_eq!(artifact.size, 5);
        assert_eq!(artifact.source, "gs://bucket/x/a.csv");
        assert!(artifact.path.exists());
    }

    #[tokio::test]
    async fn test_routing_rejects_unknown_scheme() {
        let temp = TempDir::new().unwrap();
        let downloader = RoutingDownloader::new(Arc::new(InMemoryStore::new()), HttpDownloader::new());

        let err = downloader
            .fetch(&DownloadDescriptor::new("ftp://host/file", temp.path().join("f")))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::UnsupportedScheme(_)));
    }

    #[tokio::test]
    async fn test_routing_sends_bare_paths_to_store() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new());
        store.insert("gs://bucket/x/a.csv", "a").unwrap();
        let downloader = RoutingDownloader::new(store, HttpDownloader::new());

        let artifact = downloader
            .fetch(&DownloadDescriptor::new("bucket/x/a.csv", temp.path().join("a.csv")))
            .await
            .unwrap();
        assert_eq!(artifact.size, 1);
    }

    #[test]
    fn test_is_http() {
        assert!(RoutingDownloader::is_http("https://example.org/data.json"));
        assert!(!RoutingDownloader::is_http(
            "https://bucket.storage.googleapis.com/data.json"
        ));
        assert!(!RoutingDownloader::is_http("gs://bucket/data.json"));
    }
}

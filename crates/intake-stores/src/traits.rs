//! Store and downloader traits

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{DownloadError, Result, StoreError};
use crate::store_url::StoreUrl;

/// Trait for bucket-style object stores
///
/// Generation numbers start at 1 for the first write of an object and grow
/// on every successful write. A conditional write against generation `0`
/// only succeeds while the object does not exist yet.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Get the store name
    fn name(&self) -> &str;

    /// List the direct children of `prefix`, as full store URLs.
    ///
    /// `include` wins over `exclude` when both are given.
    async fn list(
        &self,
        prefix: &str,
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Vec<String>>;

    /// Read an object as UTF-8 text together with its current generation
    async fn read_string(&self, url: &str) -> Result<(String, u64)>;

    /// Copy an object into a local file
    async fn read_to_file(&self, url: &str, destination: &Path) -> Result<()>;

    /// Unconditional upload of a local file; last writer wins
    async fn write(&self, source: &Path, url: &str) -> Result<u64>;

    /// Upload `content` only if the remote generation equals `expected_generation`.
    ///
    /// Fails with [`StoreError::GenerationMismatch`] carrying the current
    /// remote generation when another writer got there first.
    async fn write_conditional(
        &self,
        content: &str,
        url: &str,
        expected_generation: u64,
    ) -> Result<u64>;

    /// Last modification time of an object
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>>;

    /// The most recently modified object among `urls`; all must share a bucket
    async fn newest(&self, urls: &[String]) -> Result<Option<String>> {
        let mut bucket: Option<String> = None;
        for url in urls {
            let parsed = StoreUrl::parse(url)?;
            match &bucket {
                Some(b) if *b != parsed.bucket => {
                    return Err(StoreError::Other(
                        "all urls must have the same bucket name".to_string(),
                    ))
                }
                _ => bucket = Some(parsed.bucket),
            }
        }

        let mut newest: Option<(DateTime<Utc>, &String)> = None;
        for url in urls {
            let modified = self.modified_at(url).await?;
            if newest.map_or(true, |(current, _)| modified > current) {
                newest = Some((modified, url));
            }
        }
        Ok(newest.map(|(_, url)| url.clone()))
    }
}

/// What to fetch and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    /// Source URL (store or HTTP)
    pub url: String,
    /// Local file path to write
    pub destination: PathBuf,
}

impl DownloadDescriptor {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }
}

/// A resource materialized on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    /// Where it came from
    pub source: String,
    /// Where it landed
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Trait for fetching one resource to local disk
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `descriptor.url` into `descriptor.destination`
    async fn fetch(&self, descriptor: &DownloadDescriptor) -> std::result::Result<LocalArtifact, DownloadError>;
}

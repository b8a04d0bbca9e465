//! Filesystem-backed object store
//!
//! Buckets are directories under a root; `gs://bucket/a/b.json` lives at
//! `<root>/bucket/a/b.json`. Generations are kept in a parallel tree under
//! `<root>/.generations` so listings never see them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, StoreError};
use crate::listing::apply_filters;
use crate::store_url::StoreUrl;
use crate::traits::RemoteStore;

const GENERATIONS_DIR: &str = ".generations";
const STAGING_DIR: &str = ".staging";

/// Object store rooted at a local directory
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
    // held by writers and by generation-reporting readers, so a commit
    // (object rename plus sidecar) is never observed half done
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, url: &StoreUrl) -> Result<PathBuf> {
        Ok(self.root.join(&url.bucket).join(url.object()?))
    }

    fn generation_path(&self, url: &StoreUrl) -> Result<PathBuf> {
        Ok(self
            .root
            .join(GENERATIONS_DIR)
            .join(&url.bucket)
            .join(url.object()?))
    }

    async fn current_generation(&self, url: &StoreUrl) -> Result<u64> {
        match tokio::fs::read_to_string(self.generation_path(url)?).await {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|e| StoreError::Other(format!("corrupt generation for {url}: {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // objects copied in by hand have no sidecar yet
                if tokio::fs::try_exists(self.object_path(url)?).await? {
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write bytes through a temp file and bump the generation. Caller holds the write lock.
    async fn commit(&self, url: &StoreUrl, data: &[u8], current: u64) -> Result<u64> {
        let path = self.object_path(url)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // staged outside the bucket tree
        let staging = self.root.join(GENERATIONS_DIR).join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging).await?;
        let tmp = staging.join(std::process::id().to_string());
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let generation = current + 1;
        let generation_path = self.generation_path(url)?;
        if let Some(parent) = generation_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&generation_path, generation.to_string()).await?;
        Ok(generation)
    }
}

fn not_found(e: std::io::Error, url: &str) -> StoreError {
    if e.kind() == ErrorKind::NotFound {
        StoreError::NotFound(url.to_string())
    } else {
        StoreError::Io(e)
    }
}

#[async_trait::async_trait]
impl RemoteStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn list(
        &self,
        prefix: &str,
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Vec<String>> {
        let parsed = StoreUrl::parse(prefix)?;
        let bucket_dir = self.root.join(&parsed.bucket);
        if !bucket_dir.is_dir() {
            return Err(StoreError::NotFound(format!("bucket {}", parsed.bucket)));
        }

        let dir_prefix = parsed.dir_prefix();
        let dir = bucket_dir.join(&dir_prefix);
        let mut names = Vec::new();
        if dir.is_dir() {
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|e| StoreError::Other(e.to_string()))?;
                if entry.file_type().is_file() {
                    let file_name = entry.file_name().to_string_lossy();
                    names.push(format!("{dir_prefix}{file_name}"));
                }
            }
        }

        let names = apply_filters(names, include, exclude);
        if names.is_empty() {
            warn!(prefix, "no files found");
        }

        Ok(names
            .into_iter()
            .map(|name| parsed.with_object(name).to_string())
            .collect())
    }

    async fn read_string(&self, url: &str) -> Result<(String, u64)> {
        let parsed = StoreUrl::parse(url)?;

        let guard = self.write_lock.lock().await;
        let bytes = tokio::fs::read(self.object_path(&parsed)?)
            .await
            .map_err(|e| not_found(e, url))?;
        let generation = self.current_generation(&parsed).await?;
        drop(guard);

        let content = String::from_utf8(bytes).map_err(|e| StoreError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok((content, generation))
    }

    async fn read_to_file(&self, url: &str, destination: &Path) -> Result<()> {
        let parsed = StoreUrl::parse(url)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(self.object_path(&parsed)?, destination)
            .await
            .map_err(|e| not_found(e, url))?;
        debug!(url, destination = %destination.display(), "download completed");
        Ok(())
    }

    async fn write(&self, source: &Path, url: &str) -> Result<u64> {
        let parsed = StoreUrl::parse(url)?;
        let data = tokio::fs::read(source).await?;

        let _guard = self.write_lock.lock().await;
        let current = self.current_generation(&parsed).await?;
        let generation = self.commit(&parsed, &data, current).await?;
        debug!(source = %source.display(), url, generation, "uploaded file");
        Ok(generation)
    }

    async fn write_conditional(
        &self,
        content: &str,
        url: &str,
        expected_generation: u64,
    ) -> Result<u64> {
        let parsed = StoreUrl::parse(url)?;

        let _guard = self.write_lock.lock().await;
        let actual = self.current_generation(&parsed).await?;
        if actual != expected_generation {
            debug!(url, expected_generation, actual, "conditional write rejected");
            return Err(StoreError::GenerationMismatch {
                url: url.to_string(),
                expected: expected_generation,
                actual,
            });
        }
        let generation = self.commit(&parsed, content.as_bytes(), actual).await?;
        debug!(url, generation, "conditional write committed");
        Ok(generation)
    }

    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>> {
        let parsed = StoreUrl::parse(url)?;
        let metadata = tokio::fs::metadata(self.object_path(&parsed)?)
            .await
            .map_err(|e| not_found(e, url))?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }
}

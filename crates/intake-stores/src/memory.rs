//! In-process object store

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::listing::{apply_filters, is_shallow};
use crate::store_url::StoreUrl;
use crate::traits::RemoteStore;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    generation: u64,
    updated: DateTime<Utc>,
}

/// Object store kept in memory, keyed by bucket and object path.
///
/// Conditional writes compare and swap under a single lock, so concurrent
/// writers inside one process observe the same generation semantics as a
/// real bucket.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, returning its new generation
    pub fn insert(&self, url: &str, data: impl Into<Vec<u8>>) -> Result<u64> {
        let key = object_key(url)?;
        let mut objects = self.lock();
        Ok(put(&mut objects, key, data.into()))
    }

    /// Raw bytes of an object
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let key = object_key(url).ok()?;
        self.lock().get(&key).map(|o| o.data.clone())
    }

    /// Current generation of an object (0 when absent)
    pub fn generation(&self, url: &str) -> u64 {
        object_key(url)
            .ok()
            .and_then(|key| self.lock().get(&key).map(|o| o.generation))
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_object(&self, url: &str) -> Result<StoredObject> {
        let key = object_key(url)?;
        self.lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }
}

fn object_key(url: &str) -> Result<(String, String)> {
    let parsed = StoreUrl::parse(url)?;
    let object = parsed.object()?.to_string();
    Ok((parsed.bucket, object))
}

fn put(
    objects: &mut BTreeMap<(String, String), StoredObject>,
    key: (String, String),
    data: Vec<u8>,
) -> u64 {
    let generation = objects.get(&key).map_or(1, |o| o.generation + 1);
    objects.insert(
        key,
        StoredObject {
            data,
            generation,
            updated: Utc::now(),
        },
    );
    generation
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(
        &self,
        prefix: &str,
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Vec<String>> {
        let parsed = StoreUrl::parse(prefix)?;
        let dir = parsed.dir_prefix();

        let names: Vec<String> = self
            .lock()
            .keys()
            .filter(|(bucket, name)| *bucket == parsed.bucket && is_shallow(name, &dir))
            .map(|(_, name)| name.clone())
            .collect();

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
        let object = self.read_object(url)?;
        let content = String::from_utf8(object.data).map_err(|e| StoreError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok((content, object.generation))
    }

    async fn read_to_file(&self, url: &str, destination: &Path) -> Result<()> {
        let object = self.read_object(url)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &object.data).await?;
        debug!(url, destination = %destination.display(), "download completed");
        Ok(())
    }

    async fn write(&self, source: &Path, url: &str) -> Result<u64> {
        let data = tokio::fs::read(source).await?;
        let key = object_key(url)?;
        let generation = put(&mut self.lock(), key, data);
        debug!(source = %source.display(), url, generation, "uploaded file");
        Ok(generation)
    }

    async fn write_conditional(
        &self,
        content: &str,
        url: &str,
        expected_generation: u64,
    ) -> Result<u64> {
        let key = object_key(url)?;
        let mut objects = self.lock();
        let actual = objects.get(&key).map_or(0, |o| o.generation);
        if actual != expected_generation {
            debug!(url, expected_generation, actual, "conditional write rejected");
            return Err(StoreError::GenerationMismatch {
                url: url.to_string(),
                expected: expected_generation,
                actual,
            });
        }
        let generation = put(&mut objects, key, content.as_bytes().to_vec());
        debug!(url, generation, "conditional write committed");
        Ok(generation)
    }

    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>> {
        Ok(self.read_object(url)?.updated)
    }
}

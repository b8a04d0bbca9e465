//! Durable manifest storage with optimistic concurrency
//!
//! The writer holds the remote generation it last read or wrote. Every save
//! is a conditional write against that generation; when another writer got
//! there first the save is rejected with [`PersistError::GenerationMismatch`]
//! and nothing is overwritten. Whether to reload and retry is the caller's
//! call, see [`save_with_policy`].

use std::sync::Arc;

use intake_core::ConflictPolicy;
use intake_stores::{RemoteStore, StoreError};
use tracing::{info, instrument, warn};

use super::document::ManifestDocument;
use crate::error::PersistError;

/// Handle on the remote copy of a manifest
pub struct ManifestStore {
    store: Arc<dyn RemoteStore>,
    url: String,
    generation: u64,
}

impl ManifestStore {
    /// Generation starts at 0, meaning "the object must not exist yet"
    pub fn new(store: Arc<dyn RemoteStore>, url: impl Into<String>) -> Self {
        Self {
            store,
            url: url.into(),
            generation: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last generation observed by a successful read or write
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read the remote document and hold its generation.
    ///
    /// A missing object is not an error: the held generation becomes 0 and
    /// `None` is returned.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn load(&mut self) -> Result<Option<ManifestDocument>, PersistError> {
        match self.store.read_string(&self.url).await {
            Ok((content, generation)) => {
                let document = ManifestDocument::from_json(&content)?;
                self.generation = generation;
                info!(generation, "loaded remote manifest");
                Ok(Some(document))
            }
            Err(StoreError::NotFound(_)) => {
                self.generation = 0;
                info!("no remote manifest yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Conditionally write `document` against the held generation.
    ///
    /// On success the new generation is held and returned. On mismatch the
    /// held generation is left alone and the error reports the remote one.
    #[instrument(skip(self, document), fields(url = %self.url, generation = self.generation))]
    pub async fn save(&mut self, document: &ManifestDocument) -> Result<u64, PersistError> {
        let content = document.to_json()?;
        let generation = self
            .store
            .write_conditional(&content, &self.url, self.generation)
            .await?;
        info!(generation, "manifest saved");
        self.generation = generation;
        Ok(generation)
    }
}

/// Save `document`, reacting to conflicts according to `policy`.
///
/// With [`ConflictPolicy::Abandon`] a mismatch is returned as is. With
/// [`ConflictPolicy::Merge`] the remote document is reloaded, merged into
/// `document` and the write retried, up to `max_attempts` writes in total.
pub async fn save_with_policy(
    manifest_store: &mut ManifestStore,
    document: &mut ManifestDocument,
    policy: ConflictPolicy,
    max_attempts: u32,
) -> Result<u64, PersistError> {
    let mut attempt = 1;
    loop {
        match manifest_store.save(document).await {
            Err(PersistError::GenerationMismatch { expected, actual })
                if policy == ConflictPolicy::Merge && attempt < max_attempts =>
            {
                warn!(expected, actual, attempt, "manifest changed remotely, merging");
                if let Some(remote) = manifest_store.load().await? {
                    document.merge_from(remote);
                }
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{TaskManifest, TaskStatus};
    use intake_stores::InMemoryStore;

    const URL: &str = "gs://bucket/runs/manifest.json";

    fn document_with(name: &str) -> ManifestDocument {
        let mut doc = ManifestDocument::new();
        let mut entry = TaskManifest::new(name, "download");
        entry.start();
        entry.finish(TaskStatus::Completed);
        doc.insert(entry);
        doc
    }

    #[tokio::test]
    async fn test_first_save_creates_object() {
        let store = Arc::new(InMemoryStore::new());
        let mut manifest_store = ManifestStore::new(store.clone(), URL);

        assert!(manifest_store.load().await.unwrap().is_none());
        let generation = manifest_store.save(&document_with("a")).await.unwrap();

        assert_eq!(generation, 1);
        assert_eq!(manifest_store.generation(), 1);
        assert_eq!(store.generation(URL), 1);
    }

    #[tokio::test]
    async fn test_stale_generation_rejected_without_overwrite() {
        let store = Arc::new(InMemoryStore::new());
        let mut ours = ManifestStore::new(store.clone(), URL);
        ours.save(&document_with("first")).await.unwrap();
        let held = ours.generation();

        // a concurrent run commits on top of the generation we hold
        let mut theirs = ManifestStore::new(store.clone(), URL);
        theirs.load().await.unwrap();
        theirs.save(&document_with("theirs")).await.unwrap();
        let winning = store.get(URL).unwrap();

        let err = ours.save(&document_with("ours")).await.unwrap_err();
        assert!(matches!(
            err,
            PersistError::GenerationMismatch { expected, actual } if expected == held && actual == held + 1
        ));
        assert_eq!(ours.generation(), held);
        assert_eq!(store.get(URL).unwrap(), winning);
    }

    #[tokio::test]
    async fn test_load_then_save_succeeds() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert(URL, document_with("previous").to_json().unwrap())
            .unwrap();

        let mut manifest_store = ManifestStore::new(store.clone(), URL);
        let previous = manifest_store.load().await.unwrap().unwrap();
        assert!(previous.get("previous").is_some());

        assert_eq!(manifest_store.save(&document_with("next")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_abandon_policy_surfaces_conflict() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(URL, document_with("theirs").to_json().unwrap()).unwrap();

        let mut manifest_store = ManifestStore::new(store.clone(), URL);
        let mut doc = document_with("ours");
        let err = save_with_policy(&mut manifest_store, &mut doc, ConflictPolicy::Abandon, 3)
            .await
            .unwrap_err();
        assert!(err.is_generation_mismatch());
        assert!(doc.get("theirs").is_none());
    }

    #[tokio::test]
    async fn test_merge_policy_reloads_and_retries() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(URL, document_with("theirs").to_json().unwrap()).unwrap();

        let mut manifest_store = ManifestStore::new(store.clone(), URL);
        let mut doc = document_with("ours");
        let generation = save_with_policy(&mut manifest_store, &mut doc, ConflictPolicy::Merge, 3)
            .await
            .unwrap();

        assert_eq!(generation, 2);
        let (content, _) = store.read_string(URL).await.unwrap();
        let saved = ManifestDocument::from_json(&content).unwrap();
        assert!(saved.get("ours").is_some());
        assert!(saved.get("theirs").is_some());
    }

    #[tokio::test]
    async fn test_merge_policy_respects_attempt_limit() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(URL, document_with("theirs").to_json().unwrap()).unwrap();

        let mut manifest_store = ManifestStore::new(store.clone(), URL);
        let mut doc = document_with("ours");
        let err = save_with_policy(&mut manifest_store, &mut doc, ConflictPolicy::Merge, 1)
            .await
            .unwrap_err();
        assert!(err.is_generation_mismatch());
    }
}

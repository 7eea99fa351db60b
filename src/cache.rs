//! Content cache keyed by note name.
//!
//! Validity is decided against the store's own `lastModified` from a fresh
//! listing, never by local age. Entries are replaced whole and never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::NoteError;
use crate::store::NoteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: String,
    pub last_modified: i64,
}

pub struct ContentCache {
    store: Arc<dyn NoteStore>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ContentCache {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn NoteStore> {
        &self.store
    }

    /// Body of `name`.
    ///
    /// With `use_cache == false` this is a plain store read that neither
    /// consults nor updates the cache. Otherwise one listing call decides
    /// whether the cached body is still current; only a stale or missing
    /// entry costs a body read.
    pub async fn get_content(&self, name: &str, use_cache: bool) -> Result<String, NoteError> {
        if !use_cache {
            return Ok(self.store.read(name).await?);
        }

        let listing = self.store.list_full().await?;
        let remote_modified = listing
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.last_modified)
            .ok_or_else(|| NoteError::NotFound(name.to_string()))?;

        if let Some(entry) = self.entries.read().await.get(name) {
            if entry.last_modified >= remote_modified {
                debug!(note = name, last_modified = remote_modified, "cache hit");
                return Ok(entry.content.clone());
            }
        }

        debug!(note = name, last_modified = remote_modified, "cache miss, refreshing");
        let content = self.store.read(name).await?;
        self.entries.write().await.insert(
            name.to_string(),
            CacheEntry {
                content: content.clone(),
                last_modified: remote_modified,
            },
        );
        Ok(content)
    }

    /// Snapshot of the entry for `name`, if cached.
    pub async fn entry(&self, name: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

//! In-memory artifact store for testing and embedding.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::traits::{ArtifactStore, not_found, validate_batch, validate_key};

/// An artifact store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove the blob under `key`, returning it.
    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }

    /// Total bytes stored.
    pub fn total_size(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| not_found(key))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn put_all(&self, entries: &[(&str, &[u8])]) -> Result<()> {
        validate_batch(entries)?;
        let mut map = self.entries.write();
        for (key, bytes) in entries {
            map.insert(key.to_string(), bytes.to_vec());
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

//! In-memory cache store.

use super::{CacheStore, CachedBlob};
use crate::error::{Error, Result};
use crate::fingerprint::StoragePath;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local cache backed by a map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<StoragePath, CachedBlob>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<StoragePath> {
        let mut paths: Vec<StoragePath> = self
            .entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Overwrite an entry unconditionally. Intended for tests that simulate
    /// stale or misrouted entries.
    pub fn insert_raw(&self, path: StoragePath, bytes: &[u8], content_type: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                path,
                CachedBlob {
                    bytes: Bytes::copy_from_slice(bytes),
                    content_type: content_type.to_string(),
                },
            );
        }
    }
}

fn poisoned() -> Error {
    Error::Cache("memory cache lock poisoned".to_string())
}

impl CacheStore for MemoryCache {
    fn exists(&self, path: &StoragePath) -> Result<bool> {
        Ok(self.entries.read().map_err(|_| poisoned())?.contains_key(path))
    }

    fn get(&self, path: &StoragePath) -> Result<Option<CachedBlob>> {
        Ok(self.entries.read().map_err(|_| poisoned())?.get(path).cloned())
    }

    fn put(&self, path: &StoragePath, bytes: &[u8], content_type: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if let Some(existing) = entries.get(path) {
            if existing.bytes.as_ref() == bytes && existing.content_type == content_type {
                return Ok(());
            }
            // Deterministic generation means a differing write is a newer
            // pipeline revision racing an older one; last writer wins.
            log::debug!("Replacing cache entry {} with different bytes", path);
        }
        entries.insert(
            path.clone(),
            CachedBlob {
                bytes: Bytes::copy_from_slice(bytes),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::fingerprint::fingerprint_value;

    fn path(kind: ArtifactKind) -> StoragePath {
        let fp = fingerprint_value(&serde_json::json!({"plan_id": "p"}), "classic", &[]);
        StoragePath::build("p", "classic", &fp, kind)
    }

    #[test]
    fn test_put_get_exists() {
        let cache = MemoryCache::new();
        let p = path(ArtifactKind::FixedLayoutClean);
        assert!(!cache.exists(&p).unwrap());
        assert!(cache.get(&p).unwrap().is_none());

        cache.put(&p, b"%PDF-1.7", "application/pdf").unwrap();
        assert!(cache.exists(&p).unwrap());
        let blob = cache.get(&p).unwrap().unwrap();
        assert_eq!(blob.bytes.as_ref(), b"%PDF-1.7");
        assert_eq!(blob.content_type, "application/pdf");
    }

    #[test]
    fn test_put_is_idempotent() {
        let cache = MemoryCache::new();
        let p = path(ArtifactKind::WordDocument);
        cache.put(&p, b"PK", "x").unwrap();
        cache.put(&p, b"PK", "x").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_kinds_are_separate_entries() {
        let cache = MemoryCache::new();
        cache
            .put(&path(ArtifactKind::FixedLayoutClean), b"clean", "application/pdf")
            .unwrap();
        assert!(cache
            .get(&path(ArtifactKind::FixedLayoutPreview))
            .unwrap()
            .is_none());
    }
}

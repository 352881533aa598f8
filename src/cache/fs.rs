//! Filesystem cache store.
//!
//! Layout mirrors the storage path: `root/plan/template/hash/plan.pdf`, with
//! the content type in a `plan.pdf.content-type` sidecar. Entries are written
//! to a temporary file in the target directory and renamed into place, so a
//! concurrent reader sees either nothing or a complete file.

use super::{CacheStore, CachedBlob};
use crate::error::{Error, Result};
use crate::fingerprint::StoragePath;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};

const CONTENT_TYPE_SUFFIX: &str = ".content-type";

/// Cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    /// Create a cache rooted at `root` (created lazily on first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &StoragePath) -> PathBuf {
        let mut full = self.root.clone();
        for segment in path.segments() {
            full.push(segment);
        }
        full
    }

    fn sidecar_path(file: &Path) -> PathBuf {
        let mut name = file.as_os_str().to_os_string();
        name.push(CONTENT_TYPE_SUFFIX);
        PathBuf::from(name)
    }

    fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CacheStore for FsCache {
    fn exists(&self, path: &StoragePath) -> Result<bool> {
        Ok(self.file_path(path).is_file())
    }

    fn get(&self, path: &StoragePath) -> Result<Option<CachedBlob>> {
        let file = self.file_path(path);
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Cache(format!("reading {}: {}", file.display(), e))),
        };
        let content_type = match std::fs::read_to_string(Self::sidecar_path(&file)) {
            Ok(ct) => ct.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Sidecar is written before the blob, so this is a foreign file.
                log::warn!("Cache entry {} has no content type, ignoring", path);
                return Ok(None);
            },
            Err(e) => return Err(Error::Cache(format!("reading content type of {}: {}", path, e))),
        };
        Ok(Some(CachedBlob {
            bytes: Bytes::from(bytes),
            content_type,
        }))
    }

    fn put(&self, path: &StoragePath, bytes: &[u8], content_type: &str) -> Result<()> {
        let file = self.file_path(path);
        let persist_err = |e: std::io::Error| Error::CachePersistFailed {
            path: path.to_string(),
            reason: e.to_string(),
        };

        if let Ok(Some(existing)) = self.get(path) {
            if existing.bytes.as_ref() == bytes && existing.content_type == content_type {
                log::debug!("Cache entry {} already present", path);
                return Ok(());
            }
        }

        let dir = file
            .parent()
            .ok_or_else(|| Error::CachePersistFailed {
                path: path.to_string(),
                reason: "storage path has no parent directory".to_string(),
            })?
            .to_path_buf();
        std::fs::create_dir_all(&dir).map_err(persist_err)?;
        Self::write_atomic(&dir, &Self::sidecar_path(&file), content_type.as_bytes())
            .map_err(persist_err)?;
        Self::write_atomic(&dir, &file, bytes).map_err(persist_err)?;
        log::debug!("Cached {} ({} bytes)", path, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::fingerprint::fingerprint_value;
    use tempfile::tempdir;

    fn path() -> StoragePath {
        let fp = fingerprint_value(&serde_json::json!({"plan_id": "p"}), "classic", &[]);
        StoragePath::build("p", "classic", &fp, ArtifactKind::FixedLayoutPreview)
    }

    #[test]
    fn test_round_trip_on_disk() {
        let dir = tempdir().unwrap();
        let cache = FsCache::new(dir.path());
        let p = path();

        assert!(!cache.exists(&p).unwrap());
        cache.put(&p, b"%PDF-1.7 preview", "application/pdf").unwrap();
        assert!(cache.exists(&p).unwrap());

        let blob = cache.get(&p).unwrap().unwrap();
        assert_eq!(blob.bytes.as_ref(), b"%PDF-1.7 preview");
        assert_eq!(blob.content_type, "application/pdf");

        let on_disk = dir.path().join(p.as_str());
        assert!(on_disk.is_file());
    }

    #[test]
    fn test_repeated_put_is_noop() {
        let dir = tempdir().unwrap();
        let cache = FsCache::new(dir.path());
        let p = path();
        cache.put(&p, b"same", "application/pdf").unwrap();
        cache.put(&p, b"same", "application/pdf").unwrap();

        let entry_dir = dir.path().join(p.as_str());
        let entry_dir = entry_dir.parent().unwrap();
        // blob + sidecar, no leftover temp files
        assert_eq!(std::fs::read_dir(entry_dir).unwrap().count(), 2);
    }

    #[test]
    fn test_put_fails_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("root");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let cache = FsCache::new(&blocker);
        let err = cache.put(&path(), b"x", "application/pdf").unwrap_err();
        assert!(matches!(err, Error::CachePersistFailed { .. }));
    }
}

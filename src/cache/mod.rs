//! Artifact cache stores.
//!
//! The cache is an optimization, never a correctness dependency: the
//! orchestrator treats read failures as misses and logs write failures.
//! Stores never construct or rewrite paths; they only address what the
//! fingerprint builder hands them.
//!
//! Two implementations are provided:
//! - [`MemoryCache`]: process-local map, used in tests and single-process setups
//! - [`FsCache`]: one file per entry under a root directory, safe for several
//!   writers (writes land via temp file + rename)

mod fs;
mod memory;

pub use fs::FsCache;
pub use memory::MemoryCache;

use crate::error::Result;
use crate::fingerprint::StoragePath;
use bytes::Bytes;

/// A cached blob with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlob {
    /// Stored bytes
    pub bytes: Bytes,
    /// MIME type recorded at write time
    pub content_type: String,
}

/// Storage port for generated artifacts.
///
/// Implementations must be safe to share between concurrent requests.
pub trait CacheStore: Send + Sync {
    /// Whether an entry exists at `path`.
    fn exists(&self, path: &StoragePath) -> Result<bool>;

    /// Read the entry at `path`, `None` when absent.
    fn get(&self, path: &StoragePath) -> Result<Option<CachedBlob>>;

    /// Write an entry.
    ///
    /// Writing the same bytes to the same path twice is a no-op for the caller.
    fn put(&self, path: &StoragePath, bytes: &[u8], content_type: &str) -> Result<()>;
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn exists(&self, path: &StoragePath) -> Result<bool> {
        (**self).exists(path)
    }

    fn get(&self, path: &StoragePath) -> Result<Option<CachedBlob>> {
        (**self).get(path)
    }

    fn put(&self, path: &StoragePath, bytes: &[u8], content_type: &str) -> Result<()> {
        (**self).put(path, bytes, content_type)
    }
}

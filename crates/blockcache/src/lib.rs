//! # Block cache
//!
//! A process-wide, bounded cache of decoded SST data-block bytes for the
//! RiptideKV storage engine.
//!
//! SST readers open a fresh file handle per lookup (see the `sstable` crate),
//! so repeated point lookups against hot blocks would otherwise re-read the
//! same bytes from disk on every call. This cache sits in front of those
//! reads, keyed by `(file path, block offset)` so that blocks from different
//! SSTables never collide.
//!
//! Concurrent misses for the same key are coalesced: only one loader runs per
//! key at a time, and other callers wait for its result rather than each
//! reading the block independently.

use moka::sync::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key identifying a single cached data block: the SST file path and the
/// byte offset of the block within that file.
pub type BlockKey = (PathBuf, u64);

/// Bounded LRU cache of SST data blocks.
pub struct BlockCache {
    cache: Cache<BlockKey, Arc<Vec<u8>>>,
}

impl BlockCache {
    /// Creates a cache holding at most `capacity` blocks.
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    /// Returns the cached bytes for `(path, offset)`, invoking `loader` on a
    /// miss. Concurrent misses for the same key coalesce onto a single
    /// `loader` invocation.
    pub fn get_with<F>(
        &self,
        path: &Path,
        offset: u64,
        loader: F,
    ) -> Result<Arc<Vec<u8>>, Arc<std::io::Error>>
    where
        F: FnOnce() -> std::io::Result<Vec<u8>>,
    {
        let key = (path.to_path_buf(), offset);
        self.cache.try_get_with(key, || loader().map(Arc::new))
    }

    /// Removes every cached block belonging to `path`. Called right before
    /// the underlying SST file is deleted by compaction.
    pub fn invalidate_file(&self, path: &Path) {
        let target = path.to_path_buf();
        self.cache
            .invalidate_entries_if(move |(p, _), _| p == &target)
            .expect("invalidation closures enabled at construction");
    }

    /// Approximate number of blocks currently cached.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Returns `true` if the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests;

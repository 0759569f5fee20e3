//! # Engine - RiptideKV Storage Engine
//!
//! The central orchestrator that ties together the [`memtable`], [`wal`],
//! [`sstable`], and `sst_manager` crates/modules into a complete LSM-tree
//! key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append → active Memtable       │
//! │              |                                │
//! │              |  (threshold exceeded?)         │
//! │              |            yes                 │
//! │              v                                │
//! │        immutable queue → background flush     │
//! │              |                                │
//! │              v                                │
//! │           new L0 SSTable                      │
//! │              |                                │
//! │              v (background compactor, 5s)    │
//! │           merged L1 SSTable                   │
//! │                                               │
//! │ read.rs → active → immutable → SstManager     │
//! │            (first match wins)                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module          | Purpose                                                |
//! |-----------------|---------------------------------------------------------|
//! | `lib.rs`        | `Engine`/`Shared` structs, constructor, accessors, `Debug`, `Drop` |
//! | [`recovery`]    | WAL replay, tmp-file cleanup                             |
//! | [`write`]       | `put()`, `delete()`, memtable rotation, `force_flush()`  |
//! | [`read`]        | `get()`                                                  |
//! | [`sst_manager`] | Level map, flush, compaction (replaces the old `compaction`/`manifest` split) |
//! | [`background`]  | Flush and compaction threads                             |
//!
//! ## Crash safety
//!
//! Every write is appended to the WAL before the memtable update. The WAL is
//! rotated (renamed, not truncated) at memtable rotation, so an archived
//! epoch always remains on disk until its data is durably flushed. SSTables
//! are written atomically via temp file + rename; see the `sstable` crate.

use anyhow::Result;
use blockcache::BlockCache;
use config::StoreConfig;
use memtable::Memtable;
use sst_manager::SstManager;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use tracing::info;
use wal::WalWriter;

mod background;
mod error;
mod read;
mod recovery;
mod sst_manager;
mod write;

pub use error::StoreError;

/// Guards against runaway allocation on corrupt input; mirrors the limits
/// the `sstable` crate enforces internally on the wire format.
pub const MAX_KEY_SIZE: usize = 64 * 1024;
/// See [`MAX_KEY_SIZE`].
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// State shared between the `Engine` handle and its background threads.
pub(crate) struct Shared {
    config: StoreConfig,
    active: RwLock<Arc<Memtable>>,
    immutable: Mutex<VecDeque<Arc<Memtable>>>,
    wal_writer: Mutex<WalWriter>,
    sst_manager: SstManager,
    shutting_down: AtomicBool,
}

/// The central storage engine orchestrating the active memtable, the WAL,
/// and the leveled SST manager.
///
/// # Write path
///
/// 1. Append the record to the WAL (crash-safe durability, synchronous).
/// 2. Insert into the active memtable.
/// 3. If `approx_size` crosses the configured threshold, rotate: enqueue the
///    full memtable onto the immutable queue, install a fresh one, rotate
///    the WAL. A background thread drains the queue into L0 SSTables.
///
/// # Read path
///
/// 1. Active memtable (freshest data, includes tombstones).
/// 2. Immutable memtable queue.
/// 3. SST manager: L0 newest-first, then L1 by key range.
///
/// A tombstone found at any stage is reported to the caller as "not found".
///
/// # Recovery
///
/// On construction ([`Engine::new`]), the WAL is replayed into a fresh
/// memtable and existing `*.sst` files are loaded from the SST directory.
pub struct Engine {
    shared: Arc<Shared>,
    flush_handle: Mutex<Option<JoinHandle<()>>>,
    compaction_handle: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Engine {
    /// Opens (or creates) a store rooted at `config.data_dir`.
    ///
    /// Recovery order: clean up stale `*.sst.tmp` scratch files, load
    /// existing SSTables, replay the WAL into a fresh active memtable, open
    /// the WAL writer for new appends, then start the background flush and
    /// compaction threads.
    pub fn new(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        recovery::cleanup_tmp_files(&config.sst_dir)?;

        let cache = Arc::new(BlockCache::new(config.block_cache_capacity));
        let sst_manager = SstManager::load_or_create(
            &config.sst_dir,
            cache,
            config.bloom_false_positive_rate,
            config.l0_compaction_threshold,
        )?;

        let mem = Memtable::new();
        recovery::recover_from_wal(&config.wal_path, &mem)?;

        let wal_writer = WalWriter::create(&config.wal_path, config.wal_sync)?;

        let data_dir = config.data_dir.clone();
        let compaction_interval = config.compaction_interval;

        let shared = Arc::new(Shared {
            config,
            active: RwLock::new(Arc::new(mem)),
            immutable: Mutex::new(VecDeque::new()),
            wal_writer: Mutex::new(wal_writer),
            sst_manager,
            shutting_down: AtomicBool::new(false),
        });

        let flush_handle = background::spawn_flush_thread(Arc::clone(&shared));
        let compaction_handle = background::spawn_compaction_thread(Arc::clone(&shared), compaction_interval);

        info!(data_dir = %data_dir.display(), "engine started");

        Ok(Self {
            shared,
            flush_handle: Mutex::new(Some(flush_handle)),
            compaction_handle: Mutex::new(Some(compaction_handle)),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the configuration this engine was constructed with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Number of L0 SSTables.
    #[must_use]
    pub fn l0_count(&self) -> usize {
        self.shared.sst_manager.l0_count()
    }

    /// Number of L1 SSTables.
    #[must_use]
    pub fn l1_count(&self) -> usize {
        self.shared.sst_manager.l1_count()
    }

    /// Total SSTable count across both levels.
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.shared.sst_manager.sstable_count()
    }

    /// Returns `true` once [`Engine::close`] has started (or completed).
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::SeqCst)
    }

    /// Triggers an immediate compaction regardless of the L0 threshold.
    /// Returns `true` if a compaction actually ran (there was anything to
    /// merge).
    pub fn compact(&self) -> Result<bool> {
        self.shared.sst_manager.compact_force()
    }

    /// Initiates graceful shutdown: stops taking new writes, drains the
    /// active memtable into the immutable queue, joins the background flush
    /// and compaction threads (which finish flushing/compacting whatever
    /// remains), and syncs the WAL.
    ///
    /// Idempotent — calling twice, or letting [`Drop`] run afterward, is a
    /// no-op the second time.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shared.shutting_down.store(true, Ordering::SeqCst);

        {
            let mut active = self.shared.active.write().expect("active memtable lock poisoned");
            if !active.is_empty() {
                let old = std::mem::replace(&mut *active, Arc::new(Memtable::new()));
                self.shared
                    .immutable
                    .lock()
                    .expect("immutable queue lock poisoned")
                    .push_back(old);
            }
        }

        if let Some(handle) = self.flush_handle.lock().expect("flush handle lock poisoned").take() {
            let _ = handle.join();
        }
        if let Some(handle) = self
            .compaction_handle
            .lock()
            .expect("compaction handle lock poisoned")
            .take()
        {
            let _ = handle.join();
        }

        self.shared
            .wal_writer
            .lock()
            .expect("wal writer lock poisoned")
            .sync_to_disk()?;

        info!("engine closed");
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("l0_sstable_count", &self.l0_count())
            .field("l1_sstable_count", &self.l1_count())
            .field("shutting_down", &self.is_shutting_down())
            .field("data_dir", &self.shared.config.data_dir)
            .finish()
    }
}

/// Best-effort shutdown on drop, for callers that never invoke
/// [`Engine::close`] explicitly. Errors are swallowed — `Drop` cannot
/// propagate them, and anything not yet flushed is still safe in the WAL.
impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests;

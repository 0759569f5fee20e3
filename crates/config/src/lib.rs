/// Store configuration.
///
/// A single typed value, constructed once at startup and immutable for the
/// life of the store. Layered as compiled-in defaults overridden by
/// `RIPTIDE_*` environment variables; there is no config-file layer.
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MEMTABLE_THRESHOLD_BYTES: usize = 4 * 1024 * 1024;
pub const DEFAULT_L0_COMPACTION_THRESHOLD: usize = 4;
pub const DEFAULT_BLOCK_CACHE_CAPACITY: u64 = 1_000_000;
pub const DEFAULT_WAL_SYNC: bool = true;
pub const DEFAULT_COMPACTION_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BLOOM_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Layered, typed configuration for a store instance.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub sst_dir: PathBuf,
    pub wal_path: PathBuf,
    pub memtable_threshold_bytes: usize,
    pub l0_compaction_threshold: usize,
    pub block_cache_capacity: u64,
    pub wal_sync: bool,
    pub compaction_interval: Duration,
    pub bloom_false_positive_rate: f64,
}

impl StoreConfig {
    /// Pure defaults rooted at `data_dir`, for programmatic/library use.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let sst_dir = data_dir.join("sst");
        let wal_path = data_dir.join("wal.log");
        Self {
            data_dir,
            sst_dir,
            wal_path,
            memtable_threshold_bytes: DEFAULT_MEMTABLE_THRESHOLD_BYTES,
            l0_compaction_threshold: DEFAULT_L0_COMPACTION_THRESHOLD,
            block_cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
            wal_sync: DEFAULT_WAL_SYNC,
            compaction_interval: DEFAULT_COMPACTION_INTERVAL,
            bloom_false_positive_rate: DEFAULT_BLOOM_FALSE_POSITIVE_RATE,
        }
        .normalized()
    }

    /// Defaults overridden by `RIPTIDE_*` environment variables, matching the
    /// CLI's existing env-var surface. Unparseable values fall back to the
    /// default rather than failing startup.
    pub fn from_env<P: AsRef<Path>>(data_dir: P) -> Self {
        let mut cfg = Self::new(data_dir);

        if let Some(kb) = env_parse::<usize>("RIPTIDE_MEMTABLE_THRESHOLD_KB") {
            cfg.memtable_threshold_bytes = kb.saturating_mul(1024);
        }
        if let Some(n) = env_parse::<usize>("RIPTIDE_L0_TRIGGER") {
            cfg.l0_compaction_threshold = n;
        }
        if let Some(n) = env_parse::<u64>("RIPTIDE_BLOCK_CACHE_CAPACITY") {
            cfg.block_cache_capacity = n;
        }
        if let Some(b) = env_parse::<bool>("RIPTIDE_WAL_SYNC") {
            cfg.wal_sync = b;
        }
        if let Some(secs) = env_parse::<u64>("RIPTIDE_COMPACTION_INTERVAL_SECS") {
            cfg.compaction_interval = Duration::from_secs(secs);
        }

        cfg.normalized()
    }

    /// Zero-value tuning knobs are advisory, not correctness-critical; they
    /// are normalized up to the compiled-in default rather than rejected.
    fn normalized(mut self) -> Self {
        if self.memtable_threshold_bytes == 0 {
            self.memtable_threshold_bytes = DEFAULT_MEMTABLE_THRESHOLD_BYTES;
        }
        if self.l0_compaction_threshold == 0 {
            self.l0_compaction_threshold = DEFAULT_L0_COMPACTION_THRESHOLD;
        }
        if self.block_cache_capacity == 0 {
            self.block_cache_capacity = DEFAULT_BLOCK_CACHE_CAPACITY;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests;

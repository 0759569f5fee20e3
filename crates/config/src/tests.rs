use super::*;
use std::sync::Mutex;
use tempfile::tempdir;

// Environment variables are process-global; serialize tests that touch them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "RIPTIDE_MEMTABLE_THRESHOLD_KB",
        "RIPTIDE_L0_TRIGGER",
        "RIPTIDE_BLOCK_CACHE_CAPACITY",
        "RIPTIDE_WAL_SYNC",
        "RIPTIDE_COMPACTION_INTERVAL_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn new_derives_sst_dir_and_wal_path() {
    let dir = tempdir().unwrap();
    let cfg = StoreConfig::new(dir.path());
    assert_eq!(cfg.sst_dir, dir.path().join("sst"));
    assert_eq!(cfg.wal_path, dir.path().join("wal.log"));
}

#[test]
fn new_applies_compiled_in_defaults() {
    let dir = tempdir().unwrap();
    let cfg = StoreConfig::new(dir.path());
    assert_eq!(cfg.memtable_threshold_bytes, DEFAULT_MEMTABLE_THRESHOLD_BYTES);
    assert_eq!(cfg.l0_compaction_threshold, DEFAULT_L0_COMPACTION_THRESHOLD);
    assert_eq!(cfg.block_cache_capacity, DEFAULT_BLOCK_CACHE_CAPACITY);
    assert!(cfg.wal_sync);
    assert_eq!(cfg.compaction_interval, DEFAULT_COMPACTION_INTERVAL);
    assert_eq!(cfg.bloom_false_positive_rate, DEFAULT_BLOOM_FALSE_POSITIVE_RATE);
}

#[test]
fn from_env_overrides_each_field() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    std::env::set_var("RIPTIDE_MEMTABLE_THRESHOLD_KB", "128");
    std::env::set_var("RIPTIDE_L0_TRIGGER", "7");
    std::env::set_var("RIPTIDE_BLOCK_CACHE_CAPACITY", "42");
    std::env::set_var("RIPTIDE_WAL_SYNC", "false");
    std::env::set_var("RIPTIDE_COMPACTION_INTERVAL_SECS", "9");

    let cfg = StoreConfig::from_env(dir.path());
    assert_eq!(cfg.memtable_threshold_bytes, 128 * 1024);
    assert_eq!(cfg.l0_compaction_threshold, 7);
    assert_eq!(cfg.block_cache_capacity, 42);
    assert!(!cfg.wal_sync);
    assert_eq!(cfg.compaction_interval, Duration::from_secs(9));

    clear_env();
}

#[test]
fn from_env_falls_back_to_default_on_unparseable_value() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    std::env::set_var("RIPTIDE_L0_TRIGGER", "not-a-number");
    let cfg = StoreConfig::from_env(dir.path());
    assert_eq!(cfg.l0_compaction_threshold, DEFAULT_L0_COMPACTION_THRESHOLD);

    clear_env();
}

#[test]
fn zero_tuning_values_normalize_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    std::env::set_var("RIPTIDE_MEMTABLE_THRESHOLD_KB", "0");
    std::env::set_var("RIPTIDE_L0_TRIGGER", "0");
    std::env::set_var("RIPTIDE_BLOCK_CACHE_CAPACITY", "0");

    let cfg = StoreConfig::from_env(dir.path());
    assert_eq!(cfg.memtable_threshold_bytes, DEFAULT_MEMTABLE_THRESHOLD_BYTES);
    assert_eq!(cfg.l0_compaction_threshold, DEFAULT_L0_COMPACTION_THRESHOLD);
    assert_eq!(cfg.block_cache_capacity, DEFAULT_BLOCK_CACHE_CAPACITY);

    clear_env();
}

/// WAL replay and startup cleanup.
///
/// This module handles the cold-start path: replaying the WAL into a fresh
/// active memtable and removing scratch files left by a writer that crashed
/// mid-write. SSTable loading itself lives in `sst_manager`.
use anyhow::Result;
use memtable::Memtable;
use std::path::Path;
use tracing::{info, warn};

/// Replays `path` into `mem`, logging a summary of how many records were
/// applied. A missing WAL file is a no-op (fresh start).
pub fn recover_from_wal(path: &Path, mem: &Memtable) -> Result<usize> {
    let applied = wal::recover(path, mem)?;
    if applied > 0 {
        info!(records_applied = applied, "recovered memtable from wal");
    }
    Ok(applied)
}

/// Removes leftover `*.sst.tmp` files from interrupted flushes or
/// compactions. Safe to call on every startup; missing directory is a no-op.
pub fn cleanup_tmp_files(sst_dir: &Path) -> Result<()> {
    let entries = match std::fs::read_dir(sst_dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
            match std::fs::remove_file(&path) {
                Ok(()) => info!(file = %path.display(), "removed stale tmp file"),
                Err(e) => warn!(file = %path.display(), error = %e, "failed to remove stale tmp file"),
            }
        }
    }
    Ok(())
}

/// Write path: `put()`, `delete()`, `force_flush()`, and memtable rotation.
///
/// Every mutation is appended to the WAL before it is applied to the active
/// memtable. When the memtable's approximate size crosses the configured
/// threshold, it is moved onto the immutable queue and a fresh memtable
/// installed in its place; the background flush thread drains that queue to
/// L0 on its own schedule.
use crate::error::StoreError;
use crate::{Engine, MAX_KEY_SIZE, MAX_VALUE_SIZE};
use anyhow::Result;
use memtable::{Memtable, TOMBSTONE};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use wal::WalRecord;

impl Engine {
    /// Stores `key -> value`. Synchronous: the WAL append completes before
    /// this call returns.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if key.is_empty() || value.is_empty() {
            return Err(StoreError::ArgNull.into());
        }
        validate_sizes(&key, &value)?;
        self.write_record(key, value)
    }

    /// Records a tombstone for `key`, shadowing any older value on read.
    pub fn delete(&self, key: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::ArgNull.into());
        }
        if key.len() > MAX_KEY_SIZE {
            return Err(StoreError::KeyTooLarge.into());
        }
        self.write_record(key, TOMBSTONE.to_vec())
    }

    /// Forces the active memtable to a new L0 SSTable immediately, bypassing
    /// the immutable queue and the size threshold. A no-op for an empty
    /// memtable. Used by the CLI's `flush` command.
    pub fn force_flush(&self) -> Result<()> {
        if self.shared.shutting_down.load(Ordering::SeqCst) {
            return Err(StoreError::ShuttingDown.into());
        }

        let old = {
            let mut active = self.shared.active.write().expect("active memtable lock poisoned");
            if active.is_empty() {
                return Ok(());
            }
            std::mem::replace(&mut *active, Arc::new(Memtable::new()))
        };

        self.shared
            .wal_writer
            .lock()
            .expect("wal writer lock poisoned")
            .rotate_log()?;
        self.shared.sst_manager.flush_memtable(&old)?;
        Ok(())
    }

    fn write_record(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if self.shared.shutting_down.load(Ordering::SeqCst) {
            return Err(StoreError::ShuttingDown.into());
        }

        let active = self.shared.active.read().expect("active memtable lock poisoned");
        {
            let mut wal = self.shared.wal_writer.lock().expect("wal writer lock poisoned");
            wal.append(&WalRecord {
                key: key.clone(),
                value: value.clone(),
            })?;
        }
        active.put(key, value);
        let size = active.approx_size();
        drop(active);

        if size >= self.shared.config.memtable_threshold_bytes {
            self.maybe_switch_memtable()?;
        }
        Ok(())
    }

    /// Rotates the active memtable if it is still over threshold.
    /// Re-checks under the exclusive lock, since another writer may have
    /// already rotated it between the caller's threshold check and this one.
    fn maybe_switch_memtable(&self) -> Result<()> {
        let mut active = self.shared.active.write().expect("active memtable lock poisoned");
        if active.approx_size() < self.shared.config.memtable_threshold_bytes {
            return Ok(());
        }

        let old = std::mem::replace(&mut *active, Arc::new(Memtable::new()));
        self.shared
            .immutable
            .lock()
            .expect("immutable queue lock poisoned")
            .push_back(old);
        self.shared
            .wal_writer
            .lock()
            .expect("wal writer lock poisoned")
            .rotate_log()?;

        info!(threshold = self.shared.config.memtable_threshold_bytes, "memtable rotated");
        Ok(())
    }
}

fn validate_sizes(key: &[u8], value: &[u8]) -> Result<()> {
    if key.len() > MAX_KEY_SIZE {
        return Err(StoreError::KeyTooLarge.into());
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(StoreError::ValueTooLarge.into());
    }
    Ok(())
}

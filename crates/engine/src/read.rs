/// Read path: `get()`.
///
/// Point lookups check the active memtable first (freshest data), then the
/// immutable memtable queue, then the SST manager (L0 newest-first, then
/// L1 by key range). The first match wins; a tombstone found at any stage
/// is reported as "not found".
///
/// Range scans are not part of the public surface: range iteration is used
/// internally by compaction only.
use crate::Engine;
use anyhow::Result;
use memtable::is_tombstone;

impl Engine {
    /// Looks up `key`, returning its value if present and live.
    ///
    /// # Errors
    ///
    /// Returns an error if a SSTable read fails (e.g. corruption, I/O).
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let raw = {
            let active = self.shared.active.read().expect("active memtable lock poisoned");
            match active.get(key) {
                Some(v) => Some(v),
                None => {
                    drop(active);
                    let immutable = self.shared.immutable.lock().expect("immutable queue lock poisoned");
                    immutable.iter().find_map(|mem| mem.get(key))
                }
            }
        };

        let raw = match raw {
            Some(v) => Some(v),
            None => self.shared.sst_manager.get(key)?,
        };

        Ok(raw.filter(|v| !is_tombstone(v)))
    }
}

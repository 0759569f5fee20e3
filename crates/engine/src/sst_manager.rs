//! Leveled SST manager: level map, flush, cross-level point lookup, and
//! L0 -> L1 compaction.
//!
//! Exactly two levels are modeled: L0 (flush output, overlapping key ranges,
//! read newest-file-first) and L1 (compaction output, non-overlapping,
//! sorted by filename). Filenames are `L-ID.sst` with a 20-digit zero-padded
//! decimal ID, so lexicographic `BTreeMap<String, _>` order matches creation
//! order -- this is what lets L0 reads iterate `.rev()` for newest-first
//! without tracking a separate timestamp.

use anyhow::{Context, Result};
use blockcache::BlockCache;
use memtable::{is_tombstone, Memtable};
use sstable::{MergeIterator, SSTableIterator, SSTableReader, SSTableWriter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

struct SstHandle {
    reader: SSTableReader,
    entries: usize,
}

pub struct SstManager {
    sst_dir: PathBuf,
    levels: RwLock<BTreeMap<u32, BTreeMap<String, SstHandle>>>,
    next_id: AtomicU64,
    cache: Arc<BlockCache>,
    bloom_fpr: f64,
    l0_compaction_threshold: usize,
}

fn sst_filename(level: u32, id: u64) -> String {
    format!("{}-{:020}.sst", level, id)
}

/// Parses `L-ID.sst` into `(level, id)`. Anything else (including the
/// writer's own `*.sst.tmp` scratch files) is not recognized.
fn parse_sst_filename(name: &str) -> Option<(u32, u64)> {
    let stem = name.strip_suffix(".sst")?;
    let (level, id) = stem.split_once('-')?;
    Some((level.parse().ok()?, id.parse().ok()?))
}

fn count_entries(path: &Path) -> Result<usize> {
    let mut iter = SSTableIterator::open(path)?;
    let mut count = 0usize;
    while iter.has_next() {
        if iter.next()?.is_none() {
            break;
        }
        count += 1;
    }
    Ok(count)
}

impl SstManager {
    /// Enumerates `*.sst` under `sst_dir`, opens a reader for each
    /// recognized file, and advances the ID counter past the highest ID
    /// found. Unparseable filenames and corrupt files are logged and
    /// skipped rather than failing startup.
    pub fn load_or_create(
        sst_dir: &Path,
        cache: Arc<BlockCache>,
        bloom_fpr: f64,
        l0_compaction_threshold: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(sst_dir)
            .with_context(|| format!("creating sst directory {}", sst_dir.display()))?;

        let mut levels: BTreeMap<u32, BTreeMap<String, SstHandle>> = BTreeMap::new();
        let mut max_id = 0u64;

        for entry in std::fs::read_dir(sst_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            let (level, id) = match parse_sst_filename(&name) {
                Some(pair) => pair,
                None => continue,
            };
            max_id = max_id.max(id);

            match SSTableReader::open_with_cache(&path, Some(cache.clone())) {
                Ok(reader) => {
                    let entries = count_entries(&path).unwrap_or(0);
                    levels
                        .entry(level)
                        .or_default()
                        .insert(name, SstHandle { reader, entries });
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping corrupt sstable at startup");
                }
            }
        }

        info!(
            l0 = levels.get(&0).map_or(0, |m| m.len()),
            l1 = levels.get(&1).map_or(0, |m| m.len()),
            "loaded sstables"
        );

        Ok(Self {
            sst_dir: sst_dir.to_path_buf(),
            levels: RwLock::new(levels),
            next_id: AtomicU64::new(max_id + 1),
            cache,
            bloom_fpr,
            l0_compaction_threshold,
        })
    }

    /// Point lookup across levels: L0 newest-first, then L1 by key range.
    /// Returns the raw value (possibly the tombstone sentinel); the caller
    /// translates that to "not found".
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let levels = self.levels.read().expect("sst manager lock poisoned");

        if let Some(l0) = levels.get(&0) {
            for handle in l0.values().rev() {
                if let Some(v) = handle.reader.get(key)? {
                    return Ok(Some(v));
                }
            }
        }

        for (level, files) in levels.iter() {
            if *level == 0 {
                continue;
            }
            for handle in files.values() {
                if handle.reader.in_range(key) {
                    if let Some(v) = handle.reader.get(key)? {
                        return Ok(Some(v));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Flushes `mem` to a new `0-ID.sst` file. A no-op for an empty memtable.
    pub fn flush_memtable(&self, mem: &Memtable) -> Result<()> {
        if mem.is_empty() {
            return Ok(());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let filename = sst_filename(0, id);
        let path = self.sst_dir.join(&filename);
        let entries = mem.len();

        SSTableWriter::write_from_memtable(&path, mem, self.bloom_fpr)
            .with_context(|| format!("flushing memtable to {}", path.display()))?;
        let reader = SSTableReader::open_with_cache(&path, Some(self.cache.clone()))?;

        let mut levels = self.levels.write().expect("sst manager lock poisoned");
        levels
            .entry(0)
            .or_default()
            .insert(filename.clone(), SstHandle { reader, entries });

        info!(file = %filename, entries, "flushed memtable to l0");
        Ok(())
    }

    /// Threshold-gated compaction, invoked by the background compaction
    /// thread. Returns `true` if a compaction actually ran.
    pub fn compact(&self) -> Result<bool> {
        self.compact_inner(false)
    }

    /// Compacts regardless of the L0 trigger threshold. Used by the CLI's
    /// manual `compact` command.
    pub fn compact_force(&self) -> Result<bool> {
        self.compact_inner(true)
    }

    fn compact_inner(&self, force: bool) -> Result<bool> {
        // Held for the entire operation: external `get` calls see either the
        // pre- or post-compaction file set, never a mix.
        let mut levels = self.levels.write().expect("sst manager lock poisoned");

        let l0_len = levels.get(&0).map_or(0, |m| m.len());
        if l0_len == 0 || (!force && l0_len < self.l0_compaction_threshold) {
            return Ok(false);
        }

        let l0_names: Vec<String> = levels.get(&0).map(|m| m.keys().cloned().collect()).unwrap_or_default();

        let mut min_key: Option<Vec<u8>> = None;
        let mut max_key: Option<Vec<u8>> = None;
        if let Some(l0) = levels.get(&0) {
            for handle in l0.values() {
                if let Some(fk) = handle.reader.first_key() {
                    if min_key.as_deref().map_or(true, |m| fk < m) {
                        min_key = Some(fk.to_vec());
                    }
                }
                if let Some(lk) = handle.reader.last_key() {
                    if max_key.as_deref().map_or(true, |m| lk > m) {
                        max_key = Some(lk.to_vec());
                    }
                }
            }
        }
        let (min_key, max_key) = match (min_key, max_key) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(false),
        };

        let l1_names: Vec<String> = levels
            .get(&1)
            .map(|m| {
                m.iter()
                    .filter(|(_, h)| {
                        let first = h.reader.first_key();
                        let last = h.reader.last_key();
                        match (first, last) {
                            (Some(f), Some(l)) => !(l < min_key.as_slice() || f > max_key.as_slice()),
                            _ => false,
                        }
                    })
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();

        let mut sources = Vec::with_capacity(l0_names.len() + l1_names.len());
        for name in l0_names.iter().chain(l1_names.iter()) {
            let (_, id) = parse_sst_filename(name).expect("level map contains only parseable filenames");
            let path = self.sst_dir.join(name);
            sources.push((SSTableIterator::open(&path)?, id));
        }

        let mut merge = MergeIterator::new(sources)?;
        let mut merged = Vec::new();
        while let Some((key, value)) = merge.next_entry()? {
            if is_tombstone(&value) {
                // L1 is always the bottom level here, so a dropped tombstone
                // can never resurrect a stale value from a deeper level.
                continue;
            }
            merged.push((key, value));
        }

        let out_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let out_name = sst_filename(1, out_id);
        let out_entries = merged.len();

        if !merged.is_empty() {
            let out_path = self.sst_dir.join(&out_name);
            SSTableWriter::write_from_iterator(&out_path, out_entries, self.bloom_fpr, merged.into_iter())
                .with_context(|| format!("writing compaction output {}", out_path.display()))?;
            let reader = SSTableReader::open_with_cache(&out_path, Some(self.cache.clone()))?;
            levels
                .entry(1)
                .or_default()
                .insert(out_name.clone(), SstHandle { reader, entries: out_entries });
        }

        for name in l0_names.iter() {
            if let Some(handle) = levels.get_mut(&0).and_then(|m| m.remove(name)) {
                drop(handle);
                let path = self.sst_dir.join(name);
                self.cache.invalidate_file(&path);
                let _ = std::fs::remove_file(&path);
            }
        }
        for name in l1_names.iter() {
            if let Some(handle) = levels.get_mut(&1).and_then(|m| m.remove(name)) {
                drop(handle);
                let path = self.sst_dir.join(name);
                self.cache.invalidate_file(&path);
                let _ = std::fs::remove_file(&path);
            }
        }

        info!(
            inputs = l0_names.len() + l1_names.len(),
            output_entries = out_entries,
            output = %out_name,
            "compaction complete"
        );

        Ok(true)
    }

    pub fn l0_count(&self) -> usize {
        self.levels.read().expect("sst manager lock poisoned").get(&0).map_or(0, |m| m.len())
    }

    pub fn l1_count(&self) -> usize {
        self.levels.read().expect("sst manager lock poisoned").get(&1).map_or(0, |m| m.len())
    }

    pub fn sstable_count(&self) -> usize {
        self.l0_count() + self.l1_count()
    }
}

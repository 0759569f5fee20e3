use anyhow::{bail, Result};
use bloom::BloomFilter;
use byteorder::{BigEndian, WriteBytesExt};
use memtable::Memtable;
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::format::{write_footer, write_index, IndexEntry};

/// Target size of a data block before rolling over to a new one.
const BLOCK_TARGET_BYTES: usize = 4 * 1024;

/// Writes a sorted stream of entries to disk as an immutable SSTable file.
///
/// The writer is stateless: all work happens inside [`write_from_memtable`]
/// or [`write_from_iterator`]. The write is crash-safe — data is written to
/// a temporary file, fsynced, and then atomically renamed into place.
pub struct SSTableWriter {}

impl SSTableWriter {
    /// Flushes `mem` to a new SSTable file at `path`, sizing the embedded
    /// bloom filter for `mem`'s entry count at `false_positive_rate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the memtable is empty or on any I/O failure.
    pub fn write_from_memtable(path: &Path, mem: &Memtable, false_positive_rate: f64) -> Result<()> {
        if mem.is_empty() {
            bail!("refusing to write an empty SSTable (empty memtable)");
        }
        let entries = mem.iter();
        let count = entries.len();
        Self::write_internal(path, count, false_positive_rate, entries.into_iter())
    }

    /// Writes an SSTable from an iterator of `(key, value)` pairs in
    /// ascending key order. This is the streaming compaction entry point —
    /// unlike [`write_from_memtable`], the caller need not materialize the
    /// full dataset in memory.
    ///
    /// `expected_count` sizes the bloom filter; overestimating is safe,
    /// underestimating only raises the false positive rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the iterator yields zero entries or on I/O failure.
    pub fn write_from_iterator<I>(
        path: &Path,
        expected_count: usize,
        false_positive_rate: f64,
        iter: I,
    ) -> Result<()>
    where
        I: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        Self::write_internal(path, expected_count.max(1), false_positive_rate, iter)
    }

    fn write_internal<I>(
        path: &Path,
        expected_count: usize,
        false_positive_rate: f64,
        iter: I,
    ) -> Result<()>
    where
        I: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        let tmp_path = path.with_extension("sst.tmp");
        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut file = BufWriter::new(raw_file);

        let mut bloom = BloomFilter::new(expected_count.max(1), false_positive_rate);
        let mut index: Vec<IndexEntry> = Vec::new();

        let mut block_start = file.stream_position()?;
        let mut block_bytes = 0usize;
        let mut pending_last_key: Option<Vec<u8>> = None;
        let mut any_entry = false;

        for (key, value) in iter {
            let entry_bytes = 8 + key.len() + value.len();

            // The first entry of a block is admitted unconditionally so a
            // block is never emitted empty.
            if pending_last_key.is_some() && block_bytes + entry_bytes > BLOCK_TARGET_BYTES {
                let block_end = file.stream_position()?;
                index.push(IndexEntry {
                    last_key: pending_last_key.take().unwrap(),
                    block_offset: block_start,
                    block_size: (block_end - block_start) as u32,
                });
                block_start = block_end;
                block_bytes = 0;
            }

            file.write_u32::<BigEndian>(key.len() as u32)?;
            file.write_all(&key)?;
            file.write_u32::<BigEndian>(value.len() as u32)?;
            file.write_all(&value)?;

            bloom.insert(&key);
            block_bytes += entry_bytes;
            pending_last_key = Some(key);
            any_entry = true;
        }

        if !any_entry {
            drop(file);
            let _ = std::fs::remove_file(&tmp_path);
            bail!("refusing to write an empty SSTable (no entries)");
        }

        let block_end = file.stream_position()?;
        if let Some(last_key) = pending_last_key {
            index.push(IndexEntry {
                last_key,
                block_offset: block_start,
                block_size: (block_end - block_start) as u32,
            });
        }

        let index_offset = file.stream_position()?;
        write_index(&mut file, &index)?;

        let bloom_offset = file.stream_position()?;
        bloom.write_to(&mut file)?;

        write_footer(&mut file, index_offset, bloom_offset)?;

        file.flush()?;
        file.into_inner()?.sync_all()?;

        rename(&tmp_path, path)?;

        // Fsync the parent directory so the rename itself is durable; a
        // crash between rename and dir-sync can otherwise lose the entry
        // on ext4/XFS (NTFS journals metadata and needs no such sync).
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}

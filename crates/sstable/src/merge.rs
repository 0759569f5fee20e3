//! Merge iterator over multiple SST sequential iterators.
//!
//! Produces `(key, value)` pairs in ascending key order. When the same key
//! appears in more than one source file, only the entry from the file with
//! the **highest file ID** (the newest file) is emitted — the caller decides
//! what to do with tombstones.

use crate::SSTableIterator;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct HeapEntry {
    key: Vec<u8>,
    value: Vec<u8>,
    file_id: u64,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.file_id == other.file_id
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the key comparison so the
        // smallest key pops first. On a key tie, the higher file_id (the
        // newer file) should pop first.
        other
            .key
            .cmp(&self.key)
            .then_with(|| self.file_id.cmp(&other.file_id))
    }
}

/// Merges multiple SSTables' sequential iterators into one sorted stream,
/// resolving same-key duplicates by file recency.
pub struct MergeIterator {
    iters: Vec<SSTableIterator>,
    heap: BinaryHeap<HeapEntry>,
}

impl MergeIterator {
    /// Builds a merge iterator from `sources`, each an opened [`SSTableIterator`]
    /// paired with the numeric ID of the file it reads (newer files have
    /// higher IDs).
    pub fn new(sources: Vec<(SSTableIterator, u64)>) -> Result<Self> {
        let mut iters = Vec::with_capacity(sources.len());
        let mut heap = BinaryHeap::new();

        for (i, (mut iter, file_id)) in sources.into_iter().enumerate() {
            if let Some((key, value)) = iter.next()? {
                heap.push(HeapEntry {
                    key,
                    value,
                    file_id,
                    source: i,
                });
            }
            iters.push(iter);
        }

        Ok(Self { iters, heap })
    }

    /// Returns the next `(key, value)` in sorted order, or `None` once all
    /// sources are exhausted. Same-key duplicates are resolved in favor of
    /// the highest file ID.
    pub fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let top = match self.heap.pop() {
            Some(e) => e,
            None => return Ok(None),
        };

        if let Some((key, value)) = self.iters[top.source].next()? {
            self.heap.push(HeapEntry {
                key,
                value,
                file_id: top.file_id,
                source: top.source,
            });
        }

        let best_key = top.key;
        let mut best_value = top.value;
        let mut best_file_id = top.file_id;

        while let Some(peek) = self.heap.peek() {
            if peek.key != best_key {
                break;
            }
            let dup = self.heap.pop().unwrap();

            if let Some((key, value)) = self.iters[dup.source].next()? {
                self.heap.push(HeapEntry {
                    key,
                    value,
                    file_id: dup.file_id,
                    source: dup.source,
                });
            }

            if dup.file_id > best_file_id {
                best_value = dup.value;
                best_file_id = dup.file_id;
            }
        }

        Ok(Some((best_key, best_value)))
    }

    /// Collects all remaining entries. Used by tests and small compactions.
    pub fn collect_all(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut result = Vec::new();
        while let Some(pair) = self.next_entry()? {
            result.push(pair);
        }
        Ok(result)
    }
}

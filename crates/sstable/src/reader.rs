use anyhow::{bail, Context, Result};
use blockcache::BlockCache;
use bloom::BloomFilter;
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::format::{read_footer, read_index, IndexEntry, FOOTER_BYTES, MAX_KEY_BYTES, MAX_VALUE_BYTES};

/// Reads an SSTable file for point lookups.
///
/// The sparse index and bloom filter are loaded into memory on
/// [`open`](SSTableReader::open); data blocks are read fresh from disk (or
/// served from an optional shared [`BlockCache`]) on every [`get`](SSTableReader::get)
/// call. No persistent file handle is kept, so concurrent `get` calls never
/// contend on a shared seek position.
pub struct SSTableReader {
    path: PathBuf,
    index: Vec<IndexEntry>,
    bloom: Option<BloomFilter>,
    first_key: Option<Vec<u8>>,
    cache: Option<Arc<BlockCache>>,
}

impl SSTableReader {
    /// Opens `path` with no block cache.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_cache(path, None)
    }

    /// Opens `path`, routing data-block reads through `cache` when present.
    ///
    /// A file shorter than [`FOOTER_BYTES`] is treated as empty: no bloom
    /// filter, no index entries, no first key.
    pub fn open_with_cache<P: AsRef<Path>>(path: P, cache: Option<Arc<BlockCache>>) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)
            .with_context(|| format!("opening sstable {}", path_buf.display()))?;
        let filesize = f.metadata()?.len();

        if filesize < FOOTER_BYTES {
            return Ok(Self {
                path: path_buf,
                index: Vec::new(),
                bloom: None,
                first_key: None,
                cache,
            });
        }

        let footer = read_footer(&mut f)
            .with_context(|| format!("reading footer of {}", path_buf.display()))?;

        f.seek(SeekFrom::Start(footer.bloom_offset))?;
        let bloom = Some(
            BloomFilter::read_from(&mut f)
                .with_context(|| format!("reading bloom filter of {}", path_buf.display()))?,
        );

        f.seek(SeekFrom::Start(footer.index_offset))?;
        let index = read_index(&mut f)
            .with_context(|| format!("reading index of {}", path_buf.display()))?;

        let first_key = if index.is_empty() {
            None
        } else {
            f.seek(SeekFrom::Start(0))?;
            let key_len = f.read_u32::<BigEndian>()? as usize;
            if key_len > MAX_KEY_BYTES {
                bail!(
                    "corrupt sstable {}: first key length {} exceeds maximum",
                    path_buf.display(),
                    key_len
                );
            }
            let mut key = vec![0u8; key_len];
            f.read_exact(&mut key)?;
            Some(key)
        };

        Ok(Self {
            path: path_buf,
            index,
            bloom,
            first_key,
            cache,
        })
    }

    /// Smallest key in the file, or `None` if the file is empty.
    #[must_use]
    pub fn first_key(&self) -> Option<&[u8]> {
        self.first_key.as_deref()
    }

    /// Largest key in the file, or `None` if the file is empty.
    #[must_use]
    pub fn last_key(&self) -> Option<&[u8]> {
        self.index.last().map(|e| e.last_key.as_slice())
    }

    /// Returns `true` if `key` falls within `[first_key, last_key]`.
    /// Always `false` for an empty file.
    #[must_use]
    pub fn in_range(&self, key: &[u8]) -> bool {
        match (self.first_key(), self.last_key()) {
            (Some(first), Some(last)) => key >= first && key <= last,
            _ => false,
        }
    }

    /// Returns `true` if this reader has a bloom filter loaded.
    #[must_use]
    pub fn has_bloom(&self) -> bool {
        self.bloom.is_some()
    }

    /// Returns `true` if the SSTable has zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Point lookup for `key`.
    ///
    /// Checks the bloom filter first (a negative is definitive), then binary
    /// searches the sparse index for the candidate block, then linear-scans
    /// that block. Returns `Ok(Some(value))` if `key` exists in this file —
    /// the value may be the tombstone sentinel — or `Ok(None)` if absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.index.is_empty() {
            return Ok(None);
        }
        if let Some(ref bf) = self.bloom {
            if !bf.may_contain(key) {
                return Ok(None);
            }
        }

        let pos = self.index.partition_point(|e| e.last_key.as_slice() < key);
        let entry = match self.index.get(pos) {
            Some(e) => e,
            None => return Ok(None),
        };

        let block = self.read_block(entry)?;
        Ok(Self::scan_block(&block, key))
    }

    fn read_block(&self, entry: &IndexEntry) -> Result<Arc<Vec<u8>>> {
        let path = self.path.clone();
        let offset = entry.block_offset;
        let size = entry.block_size as usize;

        let load = move || -> std::io::Result<Vec<u8>> {
            let mut f = File::open(&path)?;
            f.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; size];
            f.read_exact(&mut buf)?;
            Ok(buf)
        };

        match &self.cache {
            Some(cache) => cache
                .get_with(&self.path, offset, load)
                .map_err(|e| anyhow::anyhow!("reading block at offset {} of {}: {}", offset, self.path.display(), e)),
            None => load()
                .map(Arc::new)
                .map_err(|e| anyhow::anyhow!("reading block at offset {} of {}: {}", offset, self.path.display(), e)),
        }
    }

    /// Linear-scans a decoded data block for `key`, returning its value.
    /// Stops at the first truncated record (defensive; should not occur on
    /// a well-formed file).
    fn scan_block(block: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        let mut r = block;
        loop {
            let key_len = r.read_u32::<BigEndian>().ok()? as usize;
            if key_len > r.len() || key_len > MAX_KEY_BYTES {
                return None;
            }
            let (this_key, rest) = r.split_at(key_len);
            let mut rest = rest;
            let val_len = rest.read_u32::<BigEndian>().ok()? as usize;
            if val_len > rest.len() || val_len > MAX_VALUE_BYTES {
                return None;
            }
            let (this_val, remainder) = rest.split_at(val_len);
            if this_key == key {
                return Some(this_val.to_vec());
            }
            if remainder.is_empty() {
                return None;
            }
            r = remainder;
        }
    }
}

/// Sequential reader over a single SSTable's data-block region, used only by
/// compaction. Holds its own private file handle.
pub struct SSTableIterator {
    file: File,
    offset: u64,
    index_offset: u64,
}

impl SSTableIterator {
    /// Opens `path` for sequential scanning from offset 0 up to the start of
    /// the index block.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path.as_ref())
            .with_context(|| format!("opening sstable {} for iteration", path.as_ref().display()))?;
        let filesize = file.metadata()?.len();

        let index_offset = if filesize < FOOTER_BYTES {
            0
        } else {
            let footer = read_footer(&mut file)?;
            footer.index_offset
        };

        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            file,
            offset: 0,
            index_offset,
        })
    }

    /// Returns `true` if there is at least one more entry to read.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.offset < self.index_offset
    }

    /// Reads and returns the next `(key, value)` pair, or `None` at the end
    /// of the data-block region.
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if !self.has_next() {
            return Ok(None);
        }

        let key_len = self.file.read_u32::<BigEndian>()? as usize;
        if key_len > MAX_KEY_BYTES {
            bail!("corrupt sstable: key_len {} exceeds maximum", key_len);
        }
        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;

        let val_len = self.file.read_u32::<BigEndian>()? as usize;
        if val_len > MAX_VALUE_BYTES {
            bail!("corrupt sstable: val_len {} exceeds maximum", val_len);
        }
        let mut value = vec![0u8; val_len];
        self.file.read_exact(&mut value)?;

        self.offset += 8 + key.len() as u64 + value.len() as u64;
        Ok(Some((key, value)))
    }
}

//! SSTable binary format: footer and index-block encode/decode.
//!
//! ```text
//! [data_block]*   // >=1 blocks, ~4 KiB target each
//! [index_block]   // u32 count; (u32 keyLen; key; u64 blockOffset; u32 blockSize)^count
//! [bloom_filter]  // opaque blob written by bloom::BloomFilter::write_to
//! [footer]        // u64 indexOffset; u64 bloomOffset; u64 MAGIC
//! ```
//!
//! Every multi-byte integer in the index block and footer is big-endian.
//! Files shorter than [`FOOTER_BYTES`] are treated as empty.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Identifies a well-formed SSTable footer.
pub const SSTABLE_MAGIC: u64 = 0x1234_5678_9ABC_DEF0;

/// Fixed footer size: `indexOffset(u64) + bloomOffset(u64) + MAGIC(u64)`.
pub const FOOTER_BYTES: u64 = 24;

/// Guards against runaway allocation when parsing a corrupt file.
pub const MAX_KEY_BYTES: usize = 64 * 1024;
/// Guards against runaway allocation when parsing a corrupt file.
pub const MAX_VALUE_BYTES: usize = 10 * 1024 * 1024;

/// Parsed SSTable footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub index_offset: u64,
    pub bloom_offset: u64,
}

/// Writes the 24-byte footer.
pub fn write_footer<W: Write>(w: &mut W, index_offset: u64, bloom_offset: u64) -> io::Result<()> {
    w.write_u64::<BigEndian>(index_offset)?;
    w.write_u64::<BigEndian>(bloom_offset)?;
    w.write_u64::<BigEndian>(SSTABLE_MAGIC)?;
    Ok(())
}

/// Reads and validates the footer at the end of the file. Leaves the cursor
/// position unspecified on return.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> io::Result<Footer> {
    let filesize = r.seek(SeekFrom::End(0))?;
    if filesize < FOOTER_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file too small for SSTable footer",
        ));
    }
    r.seek(SeekFrom::Start(filesize - FOOTER_BYTES))?;
    let index_offset = r.read_u64::<BigEndian>()?;
    let bloom_offset = r.read_u64::<BigEndian>()?;
    let magic = r.read_u64::<BigEndian>()?;
    if magic != SSTABLE_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad SSTable magic: {:#x}", magic),
        ));
    }
    Ok(Footer {
        index_offset,
        bloom_offset,
    })
}

/// One entry in the sparse block index: the last key in a data block and
/// that block's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub last_key: Vec<u8>,
    pub block_offset: u64,
    pub block_size: u32,
}

/// Writes the index block: `u32 count` followed by `count` index entries.
pub fn write_index<W: Write>(w: &mut W, entries: &[IndexEntry]) -> io::Result<()> {
    w.write_u32::<BigEndian>(entries.len() as u32)?;
    for e in entries {
        w.write_u32::<BigEndian>(e.last_key.len() as u32)?;
        w.write_all(&e.last_key)?;
        w.write_u64::<BigEndian>(e.block_offset)?;
        w.write_u32::<BigEndian>(e.block_size)?;
    }
    Ok(())
}

/// Reads the index block starting at the reader's current position.
pub fn read_index<R: Read>(r: &mut R) -> io::Result<Vec<IndexEntry>> {
    let count = r.read_u32::<BigEndian>()? as usize;
    let mut entries = Vec::with_capacity(count.min(1_000_000));
    for _ in 0..count {
        let key_len = r.read_u32::<BigEndian>()? as usize;
        if key_len > MAX_KEY_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("corrupt index: key_len {} exceeds maximum", key_len),
            ));
        }
        let mut last_key = vec![0u8; key_len];
        r.read_exact(&mut last_key)?;
        let block_offset = r.read_u64::<BigEndian>()?;
        let block_size = r.read_u32::<BigEndian>()?;
        entries.push(IndexEntry {
            last_key,
            block_offset,
            block_size,
        });
    }
    Ok(entries)
}

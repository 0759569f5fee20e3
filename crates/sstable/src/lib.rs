//! # SSTable — Sorted String Table
//!
//! Immutable, on-disk storage files for the RiptideKV storage engine.
//!
//! When the active memtable crosses its size threshold, the engine flushes
//! it to disk as an SSTable. SSTables are write-once, read-many — once
//! created they are never modified, only replaced wholesale during
//! compaction.
//!
//! ## File layout
//!
//! ```text
//! [data_block]*   // >=1 blocks, ~4 KiB target each
//! [index_block]   // u32 count; (u32 keyLen; key; u64 blockOffset; u32 blockSize)^count
//! [bloom_filter]  // opaque blob written by bloom::BloomFilter::write_to
//! [footer]        // u64 indexOffset; u64 bloomOffset; u64 MAGIC (0x123456789ABCDEF0)
//! ```
//!
//! Every data-block entry is `u32 keyLen; keyBytes; u32 valueLen; valueBytes`.
//! The footer is always exactly 24 bytes; a file shorter than that is
//! treated as empty. There is no per-record checksum — corruption is caught
//! at the footer (bad magic) or index (truncated/overrun) level, which is
//! sufficient given the WAL is the durability boundary for unflushed writes.

mod format;
mod merge;
mod reader;
mod writer;

pub use format::{Footer, IndexEntry, FOOTER_BYTES, SSTABLE_MAGIC};
pub use merge::MergeIterator;
pub use reader::{SSTableIterator, SSTableReader};
pub use writer::SSTableWriter;

#[cfg(test)]
mod tests;

//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the RiptideKV storage engine.
//!
//! Every mutation is serialized into a binary record and appended to the WAL
//! **before** the corresponding in-memory update. Deletes are not a distinct
//! record kind: a delete is a `Put` whose value is the reserved
//! [`memtable::TOMBSTONE`] sentinel, matching how the memtable and SST merge
//! stream represent them. On restart the WAL is replayed to reconstruct the
//! memtable, guaranteeing that no acknowledged write is lost.
//!
//! ## Binary Record Format
//!
//! ```text
//! [record_len: u32 LE][crc32: u32 LE][body ...]
//! ```
//!
//! Body: `[key_len: u32][key][val_len: u32][value]`
//!
//! `record_len` includes the 4-byte CRC but **not** itself.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalWriter, WalReader, WalRecord};
//!
//! let mut w = WalWriter::create("wal.log", true).unwrap();
//! w.append(&WalRecord {
//!     key: b"hello".to_vec(),
//!     value: b"world".to_vec(),
//! }).unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("wal.log").unwrap();
//! r.replay(|rec| println!("{:?}", rec)).unwrap();
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use memtable::Memtable;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// A single WAL record: a key-value write, where a delete is represented as
/// a write of the [`memtable::TOMBSTONE`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record failed CRC validation.
    #[error("corrupt record")]
    Corrupt,
}

/// Append-only WAL writer.
///
/// Records are serialized into an in-memory buffer, CRC-checksummed, and then
/// written to the underlying file in a single `write_all` call. When `sync` is
/// `true`, every append is followed by `sync_all()` (fsync) to guarantee the
/// record is durable on disk before the call returns.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    sync: bool,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    ///
    /// * `path` - file system path for the WAL (created if it does not exist).
    /// * `sync` - if true, every `append` call is followed by `fsync`.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `record` and appends it to the WAL file.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        self.buf.clear();
        // Reserve 8 bytes for the frame header (record_len + crc), filled later.
        self.buf.extend_from_slice(&[0u8; 8]);

        self.buf
            .write_u32::<LittleEndian>(record.key.len() as u32)?;
        self.buf.extend_from_slice(&record.key);
        self.buf
            .write_u32::<LittleEndian>(record.value.len() as u32)?;
        self.buf.extend_from_slice(&record.value);

        let body = &self.buf[8..];

        let mut hasher = Crc32::new();
        hasher.update(body);
        let crc = hasher.finalize();

        let record_len = (body.len() as u64) + 4;
        if record_len > (u32::MAX as u64) {
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "WAL record too large (exceeds u32::MAX bytes)",
            )));
        }

        let header = (record_len as u32).to_le_bytes();
        let crc_bytes = crc.to_le_bytes();
        self.buf[0..4].copy_from_slice(&header);
        self.buf[4..8].copy_from_slice(&crc_bytes);

        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Forces all buffered data to be written to disk via `sync_all()`.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Closes the current file, renames it to `<path>.<epoch-millis>`, and
    /// opens a fresh file at `path`. Called by the engine under its own
    /// memtable-switch write lock, so concurrent rotations cannot occur.
    pub fn rotate_log(&mut self) -> Result<(), WalError> {
        self.sync_to_disk()?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let archived = self
            .path
            .with_file_name(format!("{}.{}", self.path.file_name().unwrap().to_string_lossy(), millis));
        std::fs::rename(&self.path, &archived)?;

        let fresh = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)?;
        self.file = fresh;
        Ok(())
    }
}

/// Sequential WAL reader that yields valid records.
///
/// During replay, each record's CRC32 is verified. A truncated tail record
/// (e.g., from a crash mid-write) is treated as a clean EOF — all fully-written
/// records before it are still returned.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read> WalReader<R> {
    /// Constructs a reader from any `Read` implementor.
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every valid record in the WAL, calling `apply` for each one.
    ///
    /// - Clean EOF -> returns `Ok(())`.
    /// - Truncated tail (partial record at end) -> returns `Ok(())` after
    ///   yielding all complete records before it (`RECOVERY_PARTIAL`).
    /// - CRC mismatch -> returns `Err(WalError::Corrupt)`.
    /// - I/O error -> returns `Err(WalError::Io(...))`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(WalRecord),
    {
        let mut body = Vec::with_capacity(256);

        loop {
            let record_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;
            if record_len <= 4 || record_len > MAX_RECORD_SIZE {
                return Err(WalError::Corrupt);
            }

            let crc = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            let body_len = (record_len - 4) as usize;
            body.clear();
            body.resize(body_len, 0);
            match self.rdr.read_exact(&mut body) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(());
                }
                Err(e) => return Err(WalError::Io(e)),
            }

            let mut hasher = Crc32::new();
            hasher.update(&body);
            if hasher.finalize() != crc {
                return Err(WalError::Corrupt);
            }

            let mut br = &body[..];
            let key_len = br.read_u32::<LittleEndian>()? as usize;
            if key_len > body_len {
                return Err(WalError::Corrupt);
            }
            let mut key = vec![0u8; key_len];
            br.read_exact(&mut key)?;

            let val_len = br.read_u32::<LittleEndian>()? as usize;
            if val_len > body_len {
                return Err(WalError::Corrupt);
            }
            let mut value = vec![0u8; val_len];
            br.read_exact(&mut value)?;

            apply(WalRecord { key, value });
        }
    }
}

/// Replays `path` into `mem`, returning the number of records applied.
/// A missing WAL file is a no-op (fresh start), matching `recover`'s
/// contract in the spec.
pub fn recover<P: AsRef<Path>>(path: P, mem: &Memtable) -> Result<usize, WalError> {
    match WalReader::open(path.as_ref()) {
        Ok(mut reader) => {
            let mut count = 0usize;
            reader.replay(|r| {
                mem.put(r.key, r.value);
                count += 1;
            })?;
            Ok(count)
        }
        Err(WalError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

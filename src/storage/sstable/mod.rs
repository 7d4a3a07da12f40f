//! SSTable Module
//!
//! Immutable on-disk run of sorted entries. Level-0 tables come from memtable
//! flushes; deeper levels are written by compaction.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (8 bytes)                                             │
//! │   Magic: "LDBT" (4) | Version: u16 (2) | Reserved: u16 (2)   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Records (sorted by key, no duplicates)                       │
//! │   [Kind: u8][KeyLen: u32][ValLen: u32][Key][Value]           │
//! │   Kind 0 = value, 1 = tombstone (ValLen 0, no value bytes)   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Index (one slot per record)                                  │
//! │   [KeyLen: u32][Offset: u64][Key]                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer (24 bytes)                                            │
//! │   IndexOffset: u64 | EntryCount: u64 |                       │
//! │   RecordsCRC: u32 | IndexCRC: u32                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The index checksum is verified on open,
//! the records checksum whenever a table is read from start to end.

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

use bytes::Buf;

use crate::error::{LdbError, Result};

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::{Lookup, SSTableReader};

pub(crate) const MAGIC: &[u8; 4] = b"LDBT";
pub(crate) const VERSION: u16 = 2;

pub(crate) const HEADER_SIZE: u64 = 8;
pub(crate) const FOOTER_SIZE: u64 = 24;

/// Kind (1) + KeyLen (4) + ValLen (4)
pub(crate) const RECORD_HEADER_SIZE: usize = 9;

/// Record kinds
pub(crate) const KIND_VALUE: u8 = 0;
pub(crate) const KIND_TOMBSTONE: u8 = 1;

/// Metadata of a finished SSTable, returned by the builder
#[derive(Debug, Clone)]
pub struct SSTable {
    pub path: PathBuf,
    pub entry_count: u64,
    /// Smallest and largest key; both empty for a table without entries
    pub min_key: Vec<u8>,
    pub max_key: Vec<u8>,
    pub file_size: u64,
}

impl SSTable {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

/// Decoded fixed-size part of a record
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub tombstone: bool,
    pub key_len: usize,
    pub value_len: usize,
}

impl RecordHeader {
    pub(crate) fn parse(mut bytes: &[u8]) -> Result<Self> {
        let kind = bytes.get_u8();
        let key_len = bytes.get_u32_le() as usize;
        let value_len = bytes.get_u32_le() as usize;

        match kind {
            KIND_VALUE => Ok(Self {
                tombstone: false,
                key_len,
                value_len,
            }),
            KIND_TOMBSTONE if value_len == 0 => Ok(Self {
                tombstone: true,
                key_len,
                value_len,
            }),
            other => Err(LdbError::Storage(format!(
                "Invalid SSTable record (kind {}, value length {})",
                other, value_len
            ))),
        }
    }

    /// Bytes the whole record occupies on disk
    pub(crate) fn record_len(&self) -> u64 {
        (RECORD_HEADER_SIZE + self.key_len + self.value_len) as u64
    }
}

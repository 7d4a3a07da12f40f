//! SSTable Reader
//!
//! Validates a table file and answers point lookups from its key index.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Buf;
use parking_lot::Mutex;

use crate::error::{LdbError, Result};

use super::iterator::SSTableIterator;
use super::{RecordHeader, FOOTER_SIZE, HEADER_SIZE, MAGIC, RECORD_HEADER_SIZE, VERSION};

/// Result of a point lookup in one table
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Value(Vec<u8>),
    Tombstone,
    Absent,
}

/// Footer fields
#[derive(Debug, Clone, Copy)]
pub(crate) struct Footer {
    pub index_offset: u64,
    pub entry_count: u64,
    pub records_crc: u32,
    pub index_crc: u32,
}

/// An open SSTable
///
/// The key index stays in memory as a sorted vector, so lookups and seeks
/// are a binary search plus one positioned read.
pub struct SSTableReader {
    path: PathBuf,
    /// Shared handle for point lookups; iterators open their own
    file: Mutex<BufReader<File>>,
    index: Vec<(Vec<u8>, u64)>,
    footer: Footer,
    file_size: u64,
}

impl SSTableReader {
    pub fn open(path: &Path) -> Result<Self> {
        let corrupt = |what: String| LdbError::Storage(format!("{}: {}", path.display(), what));

        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(format!("table too small ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let mut cursor = &header[..];
        let mut magic = [0u8; 4];
        cursor.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(corrupt(format!("bad table magic {:?}", magic)));
        }
        let version = cursor.get_u16_le();
        if version != VERSION {
            return Err(corrupt(format!("unsupported table version {}", version)));
        }

        file.seek(SeekFrom::Start(file_size - FOOTER_SIZE))?;
        let mut raw_footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut raw_footer)?;
        let mut cursor = &raw_footer[..];
        let footer = Footer {
            index_offset: cursor.get_u64_le(),
            entry_count: cursor.get_u64_le(),
            records_crc: cursor.get_u32_le(),
            index_crc: cursor.get_u32_le(),
        };
        if footer.index_offset < HEADER_SIZE || footer.index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(format!("index offset {} out of range", footer.index_offset)));
        }

        file.seek(SeekFrom::Start(footer.index_offset))?;
        let mut raw_index = vec![0u8; (file_size - FOOTER_SIZE - footer.index_offset) as usize];
        file.read_exact(&mut raw_index)?;
        if crc32fast::hash(&raw_index) != footer.index_crc {
            return Err(corrupt("index checksum mismatch".to_string()));
        }

        let index = decode_index(&raw_index).ok_or_else(|| corrupt("malformed index".to_string()))?;
        if index.len() as u64 != footer.entry_count {
            return Err(corrupt(format!(
                "index holds {} keys, footer says {}",
                index.len(),
                footer.entry_count
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            footer,
            file_size,
        })
    }

    pub fn get(&self, key: &[u8]) -> Result<Lookup> {
        let slot = match self.index.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(slot) => slot,
            Err(_) => return Ok(Lookup::Absent),
        };
        let offset = self.index[slot].1;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut raw = [0u8; RECORD_HEADER_SIZE];
        file.read_exact(&mut raw)?;
        let record = RecordHeader::parse(&raw)?;
        if record.tombstone {
            return Ok(Lookup::Tombstone);
        }

        file.seek_relative(record.key_len as i64)?;
        let mut value = vec![0u8; record.value_len];
        file.read_exact(&mut value)?;
        Ok(Lookup::Value(value))
    }

    pub fn entry_count(&self) -> u64 {
        self.footer.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.first().map(|(k, _)| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.last().map(|(k, _)| k.as_slice())
    }

    /// Whether `key` lies within the table's key span
    pub fn covers(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => min <= key && key <= max,
            _ => false,
        }
    }

    /// Whether any key of this table can fall inside `[lower, upper)`
    pub fn overlaps(&self, lower: Option<&[u8]>, upper: Option<&[u8]>) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => {
                lower.map_or(true, |lo| max >= lo) && upper.map_or(true, |hi| min < hi)
            }
            _ => false,
        }
    }

    /// Every record in key order; the records checksum is checked at the end
    pub fn iter(&self) -> Result<SSTableIterator> {
        self.iter_from(None)
    }

    /// Records from the first key `>= lower`
    ///
    /// The iterator owns its own file handle and may outlive `self`.
    pub fn iter_from(&self, lower: Option<&[u8]>) -> Result<SSTableIterator> {
        let start = match lower {
            None => HEADER_SIZE,
            Some(lo) => {
                let slot = self.index.partition_point(|(k, _)| k.as_slice() < lo);
                self.index
                    .get(slot)
                    .map_or(self.footer.index_offset, |(_, offset)| *offset)
            }
        };
        let expected_crc = (start == HEADER_SIZE).then_some(self.footer.records_crc);
        SSTableIterator::open(&self.path, start, self.footer.index_offset, expected_crc)
    }
}

/// Decode `[key_len u32][offset u64][key]` slots; None when malformed
fn decode_index(mut raw: &[u8]) -> Option<Vec<(Vec<u8>, u64)>> {
    let mut index = Vec::new();
    while raw.has_remaining() {
        if raw.remaining() < 12 {
            return None;
        }
        let key_len = raw.get_u32_le() as usize;
        let offset = raw.get_u64_le();
        if raw.remaining() < key_len {
            return None;
        }
        index.push((raw[..key_len].to_vec(), offset));
        raw.advance(key_len);
    }
    Some(index)
}

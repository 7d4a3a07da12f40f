//! SSTable Builder
//!
//! Streams sorted entries into a new table file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::BufMut;

use crate::error::{LdbError, Result};

use super::{SSTable, HEADER_SIZE, KIND_TOMBSTONE, KIND_VALUE, MAGIC, RECORD_HEADER_SIZE, VERSION};

/// Writes one SSTable; keys must arrive in strictly ascending order
pub struct SSTableBuilder {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Offset of the next record
    offset: u64,
    /// (key, record offset) for every record, in key order
    index: Vec<(Vec<u8>, u64)>,
    records_crc: crc32fast::Hasher,
    /// Reused encoding buffer for one record
    scratch: Vec<u8>,
}

impl SSTableBuilder {
    /// Create the file and write its header
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);

        let mut header = Vec::with_capacity(HEADER_SIZE as usize);
        header.put_slice(MAGIC);
        header.put_u16_le(VERSION);
        header.put_u16_le(0);
        writer.write_all(&header)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            offset: HEADER_SIZE,
            index: Vec::new(),
            records_crc: crc32fast::Hasher::new(),
            scratch: Vec::new(),
        })
    }

    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(key, KIND_VALUE, value)
    }

    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.append(key, KIND_TOMBSTONE, &[])
    }

    fn append(&mut self, key: &[u8], kind: u8, value: &[u8]) -> Result<()> {
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(LdbError::Storage(format!(
                    "SSTable keys out of order in {}",
                    self.path.display()
                )));
            }
        }

        self.scratch.clear();
        self.scratch.reserve(RECORD_HEADER_SIZE + key.len() + value.len());
        self.scratch.put_u8(kind);
        self.scratch.put_u32_le(key.len() as u32);
        self.scratch.put_u32_le(value.len() as u32);
        self.scratch.put_slice(key);
        self.scratch.put_slice(value);

        self.writer.write_all(&self.scratch)?;
        self.records_crc.update(&self.scratch);

        self.index.push((key.to_vec(), self.offset));
        self.offset += self.scratch.len() as u64;
        Ok(())
    }

    /// Bytes written so far; compaction starts a new table past its target
    pub fn estimated_size(&self) -> u64 {
        self.offset
    }

    pub fn entry_count(&self) -> u64 {
        self.index.len() as u64
    }

    /// Write the index and footer and sync the file
    pub fn finish(mut self) -> Result<SSTable> {
        let index_offset = self.offset;

        let mut index = Vec::new();
        for (key, offset) in &self.index {
            index.put_u32_le(key.len() as u32);
            index.put_u64_le(*offset);
            index.put_slice(key);
        }

        let mut footer = Vec::with_capacity(super::FOOTER_SIZE as usize);
        footer.put_u64_le(index_offset);
        footer.put_u64_le(self.index.len() as u64);
        footer.put_u32_le(self.records_crc.clone().finalize());
        footer.put_u32_le(crc32fast::hash(&index));

        self.writer.write_all(&index)?;
        self.writer.write_all(&footer)?;

        let file = self
            .writer
            .into_inner()
            .map_err(|e| LdbError::Storage(format!("Failed to flush SSTable: {}", e)))?;
        file.sync_all()?;

        let (min_key, max_key) = match (self.index.first(), self.index.last()) {
            (Some((min, _)), Some((max, _))) => (min.clone(), max.clone()),
            _ => (Vec::new(), Vec::new()),
        };

        Ok(SSTable {
            path: self.path,
            entry_count: self.index.len() as u64,
            min_key,
            max_key,
            file_size: index_offset + index.len() as u64 + super::FOOTER_SIZE,
        })
    }
}

//! SSTable Iterator
//!
//! Streams records between a start offset and the index.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{LdbError, Result};

use super::{RecordHeader, RECORD_HEADER_SIZE};

/// Sequential reader over a table's records, in key order
///
/// Yields `(key, Some(value))` for values and `(key, None)` for tombstones.
/// An iterator that starts at the first record also checksums what it reads
/// and reports a mismatch once it reaches the index.
pub struct SSTableIterator {
    path: PathBuf,
    file: BufReader<File>,
    position: u64,
    end: u64,
    checksum: Option<(crc32fast::Hasher, u32)>,
    failed: bool,
}

impl SSTableIterator {
    pub(super) fn open(
        path: &Path,
        start: u64,
        end: u64,
        expected_crc: Option<u32>,
    ) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        file.seek(SeekFrom::Start(start))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            position: start,
            end,
            checksum: expected_crc.map(|crc| (crc32fast::Hasher::new(), crc)),
            failed: false,
        })
    }

    fn read_record(&mut self) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        let mut raw = [0u8; RECORD_HEADER_SIZE];
        self.file.read_exact(&mut raw)?;
        let record = RecordHeader::parse(&raw)?;

        if self.position + record.record_len() > self.end {
            return Err(LdbError::Storage(format!(
                "{}: record at offset {} runs into the index",
                self.path.display(),
                self.position
            )));
        }

        let mut body = vec![0u8; record.key_len + record.value_len];
        self.file.read_exact(&mut body)?;

        if let Some((hasher, _)) = self.checksum.as_mut() {
            hasher.update(&raw);
            hasher.update(&body);
        }
        self.position += record.record_len();

        let value = body.split_off(record.key_len);
        Ok((body, (!record.tombstone).then_some(value)))
    }

    fn verify_checksum(&mut self) -> Result<()> {
        if let Some((hasher, expected)) = self.checksum.take() {
            if hasher.finalize() != expected {
                return Err(LdbError::Storage(format!(
                    "{}: records checksum mismatch",
                    self.path.display()
                )));
            }
        }
        Ok(())
    }
}

impl Iterator for SSTableIterator {
    type Item = Result<(Vec<u8>, Option<Vec<u8>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.position >= self.end {
            return match self.verify_checksum() {
                Ok(()) => None,
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            };
        }

        let item = self.read_record();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

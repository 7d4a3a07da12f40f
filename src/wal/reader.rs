//! WAL Reader
//!
//! Frame-by-frame reading that tells a clean end from a torn tail or a
//! checksum failure. Never writes to the file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{LdbError, Result};

use super::entry::HEADER_SIZE;
use super::WalEntry;

/// Reads entries from the WAL file
pub struct WalReader {
    file: BufReader<File>,
    /// Byte offset of the next frame
    position: u64,
    /// Set once a torn tail has been hit; nothing after it is readable
    exhausted: bool,
}

/// Outcome of reading one frame
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete frame with a valid checksum
    Entry(WalEntry),
    /// A complete frame whose checksum or payload is bad; reading can go on
    Corrupt { offset: u64, reason: String },
    /// The file ends mid-frame at this offset
    TornTail { offset: u64 },
    /// Clean end of file
    End,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: BufReader::new(file),
            position: 0,
            exhausted: false,
        })
    }

    /// Read the next frame, classifying what was found
    pub fn read_frame(&mut self) -> Result<ReadOutcome> {
        if self.exhausted {
            return Ok(ReadOutcome::End);
        }

        let offset = self.position;
        let mut header = [0u8; HEADER_SIZE];
        let got = read_up_to(&mut self.file, &mut header)?;
        if got == 0 {
            self.exhausted = true;
            return Ok(ReadOutcome::End);
        }
        if got < HEADER_SIZE {
            self.exhausted = true;
            return Ok(ReadOutcome::TornTail { offset });
        }

        let len = match WalEntry::parse_header(&header) {
            Ok((_, _, len)) => len as usize,
            Err(_) => {
                // Length field is garbage: no later frame boundary can be found
                self.exhausted = true;
                return Ok(ReadOutcome::TornTail { offset });
            }
        };

        let mut frame = vec![0u8; HEADER_SIZE + len];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        let got = read_up_to(&mut self.file, &mut frame[HEADER_SIZE..])?;
        if got < len {
            self.exhausted = true;
            return Ok(ReadOutcome::TornTail { offset });
        }
        self.position += frame.len() as u64;

        match WalEntry::deserialize(&frame) {
            Ok(entry) => Ok(ReadOutcome::Entry(entry)),
            Err(e) => Ok(ReadOutcome::Corrupt {
                offset,
                reason: e.to_string(),
            }),
        }
    }

    /// Read the next valid entry, failing on any damage
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_frame()? {
            ReadOutcome::Entry(entry) => Ok(Some(entry)),
            ReadOutcome::End => Ok(None),
            ReadOutcome::Corrupt { offset, reason } => Err(LdbError::WalCorruption(format!(
                "at offset {}: {}",
                offset, reason
            ))),
            ReadOutcome::TornTail { offset } => Err(LdbError::WalCorruption(format!(
                "incomplete entry at offset {}",
                offset
            ))),
        }
    }

    /// Iterate over all entries, yielding an error at the first damaged one
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Byte offset of the next frame to be read
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows, returning the number of bytes read
fn read_up_to(file: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

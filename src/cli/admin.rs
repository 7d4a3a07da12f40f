//! Administrative commands
//!
//! These forward straight to the engine. Success means the engine call
//! returned without error; the resulting layout is not re-checked here.

use std::io::Write;
use std::path::Path;

use crate::engine::Engine;
use crate::error::{LdbError, Result};
use crate::storage::CompactionStats;
use crate::wal::{Operation, ReadOutcome, WalEntry, WalReader};

use super::codec::encode_hex;
use super::scan::KeyRange;

/// Column titles printed by `dump_wal --header`
pub const WAL_HEADER: &str = "lsn,timestamp_ms,op,key,value";

pub fn compact(engine: &Engine, range: &KeyRange) -> Result<CompactionStats> {
    engine.compact_range(range.from.as_deref(), range.to.as_deref())
}

pub fn reduce_levels(engine: &Engine, new_levels: u32) -> Result<CompactionStats> {
    engine.reduce_levels(new_levels)
}

/// Read every record of a WAL file, failing on the first damaged frame
pub fn inspect_wal(path: &Path) -> Result<Vec<WalEntry>> {
    if !path.is_file() {
        return Err(LdbError::Engine(format!(
            "WAL file not found: {}",
            path.display()
        )));
    }

    let mut reader = WalReader::open(path)?;
    let mut entries = Vec::new();
    loop {
        match reader.read_frame()? {
            ReadOutcome::Entry(entry) => entries.push(entry),
            ReadOutcome::End => return Ok(entries),
            ReadOutcome::Corrupt { offset, reason } => {
                return Err(LdbError::WalCorruption(format!(
                    "{} at offset {}: {}",
                    path.display(),
                    offset,
                    reason
                )))
            }
            ReadOutcome::TornTail { offset } => {
                return Err(LdbError::WalCorruption(format!(
                    "{} ends inside a record at offset {}",
                    path.display(),
                    offset
                )))
            }
        }
    }
}

/// Handler for `dump_wal`: one CSV line per logged write, keys/values in hex
pub fn dump_wal(path: &Path, header: bool, out: &mut dyn Write) -> Result<usize> {
    let entries = inspect_wal(path)?;

    if header {
        writeln!(out, "{}", WAL_HEADER)?;
    }

    for entry in &entries {
        let prefix = format!("{},{}", entry.lsn, entry.timestamp);
        let op = entry.operation.name();
        match &entry.operation {
            Operation::Put { key, value } => {
                writeln!(out, "{},{},{},{}", prefix, op, encode_hex(key), encode_hex(value))?
            }
            Operation::Delete { key } => writeln!(out, "{},{},{},", prefix, op, encode_hex(key))?,
            Operation::Batch { puts } => {
                for (key, value) in puts {
                    writeln!(out, "{},{},{},{}", prefix, op, encode_hex(key), encode_hex(value))?;
                }
            }
        }
    }

    Ok(entries.len())
}

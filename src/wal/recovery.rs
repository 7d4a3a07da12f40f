//! WAL Recovery
//!
//! Collects the replayable frames of a log left by an unclean shutdown.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::ReadOutcome;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Detect and skip corrupted entries
    /// 3. Truncate partial writes at end
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, torn_at) = Self::scan(path, true)?;

        if let Some(offset) = torn_at {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset)?;
            file.sync_all()?;
            tracing::warn!(path = %path.display(), offset, "truncated torn WAL tail");
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path, false)?;
        Ok(result)
    }

    fn scan(path: &Path, keep: bool) -> Result<(Vec<WalEntry>, RecoveryResult, Option<u64>)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut torn_at = None;

        loop {
            match reader.read_frame()? {
                ReadOutcome::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    if keep {
                        entries.push(entry);
                    }
                }
                ReadOutcome::Corrupt { offset, reason } => {
                    tracing::warn!(offset, %reason, "skipping corrupted WAL entry");
                    result.entries_corrupted += 1;
                }
                ReadOutcome::TornTail { offset } => {
                    result.was_truncated = true;
                    torn_at = Some(offset);
                    break;
                }
                ReadOutcome::End => break,
            }
        }

        Ok((entries, result, torn_at))
    }
}

//! Command definitions
//!
//! A fully validated invocation: every key, value and bound has already been
//! decoded, so handlers never re-check flags.

use std::path::PathBuf;

use super::codec::{Encoding, EncodingMode};
use super::scan::KeyRange;
use super::schema::CommandKind;

/// A parsed and validated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the value of a key
    Get { key: Vec<u8>, value_mode: EncodingMode },

    /// Write one pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Print the pairs of a range
    Scan {
        range: KeyRange,
        max_keys: Option<u64>,
        encoding: Encoding,
    },

    /// Write several pairs as one batch
    BatchPut { pairs: Vec<(Vec<u8>, Vec<u8>)> },

    /// Write a dump stream
    Dump {
        range: KeyRange,
        max_keys: Option<u64>,
        mode: EncodingMode,
        count_only: bool,
    },

    /// Read a dump stream from input
    Load { mode: EncodingMode },

    Compact { range: KeyRange },

    ReduceLevels { new_levels: u32 },

    /// Print a WAL file; `None` means the store's own log
    DumpWal { walfile: Option<PathBuf>, header: bool },
}

impl Command {
    /// Get the command kind
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Get { .. } => CommandKind::Get,
            Command::Put { .. } => CommandKind::Put,
            Command::Delete { .. } => CommandKind::Delete,
            Command::Scan { .. } => CommandKind::Scan,
            Command::BatchPut { .. } => CommandKind::BatchPut,
            Command::Dump { .. } => CommandKind::Dump,
            Command::Load { .. } => CommandKind::Load,
            Command::Compact { .. } => CommandKind::Compact,
            Command::ReduceLevels { .. } => CommandKind::ReduceLevels,
            Command::DumpWal { .. } => CommandKind::DumpWal,
        }
    }
}

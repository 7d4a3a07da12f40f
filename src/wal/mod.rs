//! Write-Ahead Log
//!
//! Every put, delete and batch is framed and appended to `wal.log` before it
//! reaches the memtable. The log is truncated once a flush has made its
//! contents durable in an SSTable, so it only ever holds unflushed writes.
//!
//! Frame layout (little-endian):
//! ```text
//! [lsn u64][crc u32][len u32][payload: len bytes]
//! ```
//! The payload is bincode of `(unix_millis, Operation)`; the CRC is taken
//! over lsn, len and payload together.
//!
//! Reading distinguishes three ways a log can end: cleanly, with a torn
//! final frame (a crash mid-append), or with a frame whose checksum fails.
//! Recovery truncates a torn tail and skips corrupt frames; `dump_wal` reads
//! the same frames without touching the file.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE};
pub use reader::{ReadOutcome, WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;

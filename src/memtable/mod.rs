//! MemTable
//!
//! Sorted in-memory buffer of writes not yet flushed to level 0. Deletes are
//! kept as tombstones so they can shadow older SSTable values until a
//! compaction into the bottom level drops them.

mod table;

pub use table::MemTable;

/// What the memtable holds for a key
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    Value(Vec<u8>),
    /// Deleted since the last flush
    Tombstone,
}

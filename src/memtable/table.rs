//! MemTable implementation

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::MemTableEntry;

/// Fixed per-entry overhead counted towards the approximate size
const ENTRY_OVERHEAD: usize = 16;

/// In-memory table for recent writes
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, MemTableEntry>>,
    /// Approximate size in bytes
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get the entry for a key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock), returning the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Delete a key (write lock, inserts tombstone), returning the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let added = Self::entry_size(&key, &entry);
        let mut data = self.data.write();
        let removed = match data.insert(key.clone(), entry) {
            Some(old) => Self::entry_size(&key, &old),
            None => 0,
        };
        drop(data);

        if added >= removed {
            self.size.fetch_add(added - removed, Ordering::SeqCst) + (added - removed)
        } else {
            self.size.fetch_sub(removed - added, Ordering::SeqCst) - (removed - added)
        }
    }

    fn entry_size(key: &[u8], entry: &MemTableEntry) -> usize {
        let value_len = match entry {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        };
        key.len() + value_len + ENTRY_OVERHEAD
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Snapshot of all entries in sorted key order (for flush)
    pub fn iter(&self) -> std::vec::IntoIter<(Vec<u8>, MemTableEntry)> {
        self.range(None, None)
    }

    /// Snapshot of the entries in `[lower, upper)`, tombstones included
    pub fn range(
        &self,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> std::vec::IntoIter<(Vec<u8>, MemTableEntry)> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            // BTreeMap::range panics on inverted bounds
            if lo >= hi {
                return Vec::new().into_iter();
            }
        }

        let start = lower.map_or(Bound::Unbounded, Bound::Included);
        let end = upper.map_or(Bound::Unbounded, Bound::Excluded);

        let data = self.data.read();
        data.range::<[u8], _>((start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        self.data.write().clear();
        self.size.store(0, Ordering::SeqCst);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

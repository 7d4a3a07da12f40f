//! Storage Module
//!
//! Persistent storage layer: leveled SSTables tracked by a manifest.
//!
//! ## Responsibilities
//! - Persist data to disk in sorted format
//! - Point lookups and seekable range iteration
//! - Range compaction and level reduction
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── MANIFEST               (live tables and their levels)
//!   └── sstables/
//!        ├── sstable_000001.sst
//!        └── ...
//! ```

mod manager;
mod manifest;
mod merge;
pub mod sstable;

pub use manager::{CompactionStats, StorageManager};
pub use manifest::{Manifest, TableRecord};
pub use merge::{Entry, MergeIterator, Source};
pub use sstable::{SSTable, SSTableBuilder, SSTableReader};

//! Storage Manager
//!
//! Owns the leveled table set. The MANIFEST is rewritten after every change
//! to it (flush, compaction, level reduction); table files it no longer
//! names are deleted, on open as well as after compaction.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{LdbError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::merge::{MergeIterator, Source};
use super::sstable::{Lookup, SSTableBuilder, SSTableIterator, SSTableReader};
use super::{Manifest, SSTable, TableRecord};

/// A live table and the level it sits on
#[derive(Clone)]
struct LiveTable {
    record: TableRecord,
    reader: Arc<SSTableReader>,
}

struct LevelState {
    manifest: Manifest,
    /// Ordered newest → oldest (descending table id)
    tables: Vec<LiveTable>,
}

/// Summary of one compaction run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    pub input_tables: usize,
    pub output_tables: usize,
    pub entries_written: u64,
    pub tombstones_dropped: u64,
}

/// Manages the storage layer
///
/// ## Concurrency:
/// - `state`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - All methods use `&self`
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,
    manifest_path: PathBuf,
    state: RwLock<LevelState>,
}

impl StorageManager {
    /// Open storage, creating an empty manifest with `num_levels` if absent
    ///
    /// On startup:
    /// 1. Create the SSTable directory if it doesn't exist
    /// 2. Load (or create) the manifest
    /// 3. Open readers for every live table (loads indexes into RAM)
    /// 4. Remove table files the manifest does not know about
    pub fn open(data_dir: &Path, manifest_path: &Path, num_levels: u32) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let manifest = if manifest_path.exists() {
            Manifest::load(manifest_path)?
        } else {
            let manifest = Manifest::new(num_levels.max(1));
            manifest.store(manifest_path)?;
            manifest
        };

        let mut tables = Vec::with_capacity(manifest.tables.len());
        for record in &manifest.tables {
            let reader = SSTableReader::open(&Self::sstable_path_with_dir(data_dir, record.id))?;
            tables.push(LiveTable {
                record: *record,
                reader: Arc::new(reader),
            });
        }
        tables.sort_by(|a, b| b.record.id.cmp(&a.record.id));

        Self::remove_orphans(data_dir, &manifest)?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            manifest_path: manifest_path.to_path_buf(),
            state: RwLock::new(LevelState { manifest, tables }),
        })
    }

    /// Newest table holding `key` decides; a tombstone there reads as None
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();

        for table in &state.tables {
            if !table.reader.covers(key) {
                continue;
            }
            match table.reader.get(key)? {
                Lookup::Value(value) => return Ok(Some(value)),
                Lookup::Tombstone => return Ok(None),
                Lookup::Absent => continue,
            }
        }

        Ok(None)
    }

    /// Flush a MemTable to a new level-0 SSTable
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(LdbError::Storage("Cannot flush empty MemTable".to_string()));
        }

        let mut state = self.state.write();
        let id = state.manifest.allocate_id();
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let metadata = builder.finish()?;

        let record = TableRecord { id, level: 0 };
        state.manifest.tables.push(record);
        state.manifest.store(&self.manifest_path)?;

        let reader = SSTableReader::open(&path)?;
        state.tables.insert(
            0,
            LiveTable {
                record,
                reader: Arc::new(reader),
            },
        );

        tracing::debug!(id, entries = metadata.entry_count, "flushed memtable to level 0");
        Ok(metadata)
    }

    /// Sorted sources for a scan starting at `lower`, newest first
    ///
    /// Only tables that can hold keys in `[lower, upper)` are opened.
    pub fn scan_sources(&self, lower: Option<&[u8]>, upper: Option<&[u8]>) -> Result<Vec<Source>> {
        let state = self.state.read();
        let mut sources: Vec<Source> = Vec::new();
        for table in &state.tables {
            if table.reader.overlaps(lower, upper) {
                let iter: SSTableIterator = table.reader.iter_from(lower)?;
                sources.push(Box::new(iter));
            }
        }
        Ok(sources)
    }

    /// Compact every table overlapping `[lower, upper)` into the bottom level
    ///
    /// The input set is widened until no other table overlaps its key span,
    /// which makes it safe to drop tombstones from the output.
    pub fn compact_range(
        &self,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        max_file_size: u64,
    ) -> Result<CompactionStats> {
        let mut state = self.state.write();
        let output_level = state.manifest.num_levels - 1;
        let inputs = Self::select_inputs(&state.tables, lower, upper);
        self.compact_tables(&mut state, &inputs, output_level, max_file_size)
    }

    /// Change the number of levels, first moving every table that would sit
    /// at or beyond the new bottom level down into it
    pub fn reduce_levels(&self, new_levels: u32, max_file_size: u64) -> Result<CompactionStats> {
        if new_levels < 1 {
            return Err(LdbError::Engine(format!(
                "Number of levels must be at least 1, got {}",
                new_levels
            )));
        }

        let mut state = self.state.write();
        let old_levels = state.manifest.num_levels;

        let needs_compaction = state
            .tables
            .iter()
            .any(|t| t.record.level >= new_levels);

        let stats = if needs_compaction {
            // Everything collapses into one sorted run at the new bottom level
            let inputs: BTreeSet<u64> = state.tables.iter().map(|t| t.record.id).collect();
            self.compact_tables(&mut state, &inputs, new_levels - 1, max_file_size)?
        } else {
            CompactionStats::default()
        };

        state.manifest.num_levels = new_levels;
        state.manifest.store(&self.manifest_path)?;

        tracing::debug!(old_levels, new_levels, "reduced levels");
        Ok(stats)
    }

    pub fn sstable_count(&self) -> usize {
        self.state.read().tables.len()
    }

    pub fn num_levels(&self) -> u32 {
        self.state.read().manifest.num_levels
    }

    /// Number of tables at each level
    pub fn level_counts(&self) -> Vec<usize> {
        self.state.read().manifest.level_counts()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn select_inputs(
        tables: &[LiveTable],
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> BTreeSet<u64> {
        let mut inputs: BTreeSet<u64> = tables
            .iter()
            .filter(|t| t.reader.overlaps(lower, upper))
            .map(|t| t.record.id)
            .collect();

        loop {
            let span = tables
                .iter()
                .filter(|t| inputs.contains(&t.record.id))
                .filter_map(|t| Some((t.reader.min_key()?, t.reader.max_key()?)))
                .fold(None, |acc: Option<(&[u8], &[u8])>, (min, max)| match acc {
                    None => Some((min, max)),
                    Some((lo, hi)) => Some((lo.min(min), hi.max(max))),
                });

            let (lo, hi) = match span {
                Some(span) => span,
                None => return inputs,
            };

            let before = inputs.len();
            for table in tables {
                let overlaps = match (table.reader.min_key(), table.reader.max_key()) {
                    (Some(min), Some(max)) => max >= lo && min <= hi,
                    _ => false,
                };
                if overlaps {
                    inputs.insert(table.record.id);
                }
            }
            if inputs.len() == before {
                return inputs;
            }
        }
    }

    fn compact_tables(
        &self,
        state: &mut LevelState,
        inputs: &BTreeSet<u64>,
        output_level: u32,
        max_file_size: u64,
    ) -> Result<CompactionStats> {
        let mut stats = CompactionStats {
            input_tables: inputs.len(),
            ..Default::default()
        };
        if inputs.is_empty() {
            return Ok(stats);
        }

        let mut sources: Vec<Source> = Vec::new();
        for table in state.tables.iter().filter(|t| inputs.contains(&t.record.id)) {
            sources.push(Box::new(table.reader.iter()?));
        }

        let mut outputs: Vec<TableRecord> = Vec::new();
        let mut builder: Option<SSTableBuilder> = None;

        for entry in MergeIterator::new(sources) {
            let (key, value) = entry?;
            let value = match value {
                Some(v) => v,
                None => {
                    stats.tombstones_dropped += 1;
                    continue;
                }
            };

            if builder.is_none() {
                let id = state.manifest.allocate_id();
                builder = Some(SSTableBuilder::new(&self.sstable_path(id))?);
                outputs.push(TableRecord {
                    id,
                    level: output_level,
                });
            }
            if let Some(b) = builder.as_mut() {
                b.add(&key, &value)?;
                stats.entries_written += 1;
                if b.estimated_size() >= max_file_size {
                    if let Some(full) = builder.take() {
                        full.finish()?;
                    }
                }
            }
        }
        if let Some(b) = builder.take() {
            b.finish()?;
        }

        let mut new_tables = Vec::with_capacity(outputs.len());
        for record in &outputs {
            let reader = SSTableReader::open(&self.sstable_path(record.id))?;
            new_tables.push(LiveTable {
                record: *record,
                reader: Arc::new(reader),
            });
        }

        state.manifest.tables.retain(|t| !inputs.contains(&t.id));
        state.manifest.tables.extend(outputs.iter().copied());
        state.manifest.store(&self.manifest_path)?;

        state.tables.retain(|t| !inputs.contains(&t.record.id));
        state.tables.extend(new_tables);
        state.tables.sort_by(|a, b| b.record.id.cmp(&a.record.id));

        // Old files go only after the manifest stopped referencing them
        for id in inputs {
            if let Err(e) = fs::remove_file(self.sstable_path(*id)) {
                tracing::warn!(id, error = %e, "failed to remove compacted SSTable");
            }
        }

        stats.output_tables = outputs.len();
        tracing::debug!(
            inputs = stats.input_tables,
            outputs = stats.output_tables,
            entries = stats.entries_written,
            tombstones = stats.tombstones_dropped,
            level = output_level,
            "compaction finished"
        );
        Ok(stats)
    }

    fn remove_orphans(dir: &Path, manifest: &Manifest) -> Result<()> {
        let live: BTreeSet<u64> = manifest.tables.iter().map(|t| t.id).collect();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if let Some(id) = Self::parse_sstable_id(&path) {
                if !live.contains(&id) {
                    tracing::debug!(id, "removing orphaned SSTable");
                    fs::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    /// Generate SSTable path given a directory and ID
    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("sstable_")?.parse().ok()
    }
}

//! Engine
//!
//! The store `ldb` operates on. Writes go WAL → memtable and are flushed to
//! level-0 SSTables; reads consult the memtable, then tables newest first.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{LdbError, Result};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::{CompactionStats, Entry, MergeIterator, Source, StorageManager};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Files and directories of one store
#[derive(Debug, Clone)]
struct StorePaths {
    manifest: PathBuf,
    wal: PathBuf,
    tables: PathBuf,
}

impl StorePaths {
    fn new(root: &Path) -> Self {
        Self {
            manifest: root.join(Engine::MANIFEST_FILENAME),
            wal: root.join(Engine::WAL_FILENAME),
            tables: root.join(Engine::SSTABLE_DIR),
        }
    }
}

/// An open store
///
/// Mutations (writes, flushes, compactions) hold `write_lock` for their whole
/// duration. Reads take no engine lock; the memtable and the storage manager
/// each protect their own state.
pub struct Engine {
    config: Config,
    paths: StorePaths,
    wal: Mutex<WalWriter>,
    memtable: MemTable,
    storage: StorageManager,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl Engine {
    pub const WAL_FILENAME: &'static str = "wal.log";
    pub const MANIFEST_FILENAME: &'static str = "MANIFEST";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open (or with `create_if_missing`, create) the store at `config.data_dir`
    ///
    /// Any WAL left by an unclean shutdown is replayed and flushed to level 0
    /// before the log is reset. Every failure is reported as
    /// [`LdbError::Open`].
    pub fn open(config: Config) -> Result<Self> {
        let root = config.data_dir.display().to_string();
        Self::open_store(config).map_err(|e| match e {
            LdbError::Open { .. } => e,
            other => LdbError::Open {
                path: root,
                reason: other.to_string(),
            },
        })
    }

    fn open_store(config: Config) -> Result<Self> {
        let paths = StorePaths::new(&config.data_dir);

        if !paths.manifest.exists() {
            if !config.create_if_missing {
                return Err(LdbError::Open {
                    path: config.data_dir.display().to_string(),
                    reason: "store does not exist (create_if_missing is false)".to_string(),
                });
            }
            fs::create_dir_all(&config.data_dir)?;
            tracing::debug!(path = %config.data_dir.display(), "creating new store");
        }

        let storage = StorageManager::open(&paths.tables, &paths.manifest, config.num_levels)?;
        let memtable = MemTable::new();

        if paths.wal.exists() {
            Self::replay_wal(&paths.wal, &memtable, &storage)?;
        }

        let mut wal = WalWriter::open(&paths.wal, config.wal_sync_strategy)?;
        wal.truncate()?;

        tracing::debug!(
            path = %config.data_dir.display(),
            levels = storage.num_levels(),
            tables = storage.sstable_count(),
            write_buffer_size = config.write_buffer_size,
            max_file_size = config.max_file_size,
            compression = %config.table.compression,
            bloom_bits = ?config.table.bloom_bits,
            block_size = ?config.table.block_size,
            "store opened"
        );

        Ok(Self {
            config,
            paths,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Apply surviving WAL frames and persist them as a level-0 table
    fn replay_wal(path: &Path, memtable: &MemTable, storage: &StorageManager) -> Result<()> {
        let (entries, summary) = WalRecovery::recover(path)?;
        if summary.entries_recovered > 0 || summary.entries_corrupted > 0 {
            tracing::debug!(
                recovered = summary.entries_recovered,
                corrupted = summary.entries_corrupted,
                last_lsn = summary.last_lsn,
                "replayed WAL"
            );
        }

        for entry in entries {
            Self::apply(memtable, entry.operation);
        }
        if !memtable.is_empty() {
            storage.flush(memtable)?;
            memtable.clear();
        }
        Ok(())
    }

    /// Newest value for `key`, or None when absent or deleted
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.memtable.get(key) {
            Some(MemTableEntry::Value(value)) => Ok(Some(value)),
            Some(MemTableEntry::Tombstone) => Ok(None),
            None => self.storage.get(key),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Deleting an absent key succeeds
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write(Operation::Delete { key: key.to_vec() })
    }

    /// Store several pairs under a single WAL frame
    pub fn write_batch(&self, puts: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        if puts.is_empty() {
            return Ok(());
        }
        self.write(Operation::Batch { puts })
    }

    fn write(&self, operation: Operation) -> Result<()> {
        let _guard = self.write_lock.lock();

        if !self.config.disable_wal {
            self.wal.lock().append(operation.clone())?;
        }

        if Self::apply(&self.memtable, operation) >= self.config.write_buffer_size {
            self.flush_locked()?;
        }
        Ok(())
    }

    /// Returns the memtable size after the operation
    fn apply(memtable: &MemTable, operation: Operation) -> usize {
        match operation {
            Operation::Put { key, value } => memtable.put(key, value),
            Operation::Delete { key } => memtable.delete(key),
            Operation::Batch { puts } => puts
                .into_iter()
                .fold(memtable.size(), |_, (key, value)| memtable.put(key, value)),
        }
    }

    /// Live pairs with `lower <= key < upper`, ascending
    ///
    /// Memtable contents are captured now; SSTables are read lazily as the
    /// iterator advances.
    pub fn scan(&self, lower: Option<&[u8]>, upper: Option<&[u8]>) -> Result<DbIterator> {
        let buffered: Source = Box::new(self.memtable.range(lower, upper).map(|(key, entry)| {
            Ok(match entry {
                MemTableEntry::Value(value) => (key, Some(value)),
                MemTableEntry::Tombstone => (key, None),
            })
        }));

        let mut sources = vec![buffered];
        sources.extend(self.storage.scan_sources(lower, upper)?);

        Ok(DbIterator {
            merged: MergeIterator::new(sources),
            upper: upper.map(<[u8]>::to_vec),
            exhausted: false,
        })
    }

    /// Rewrite every table overlapping `[lower, upper)` into the bottom level
    pub fn compact_range(
        &self,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> Result<CompactionStats> {
        let _guard = self.write_lock.lock();
        self.flush_locked()?;
        self.storage
            .compact_range(lower, upper, self.config.max_file_size)
    }

    pub fn reduce_levels(&self, new_levels: u32) -> Result<CompactionStats> {
        let _guard = self.write_lock.lock();
        self.flush_locked()?;
        self.storage
            .reduce_levels(new_levels, self.config.max_file_size)
    }

    pub fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.flush_locked()
    }

    /// Caller holds `write_lock`
    fn flush_locked(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();
        self.wal.lock().truncate()?;

        let level0 = self.storage.level_counts().first().copied().unwrap_or(0);
        if self.config.auto_compaction && level0 >= Config::L0_COMPACTION_TRIGGER {
            tracing::debug!(level0, "level-0 trigger reached, compacting");
            self.storage
                .compact_range(None, None, self.config.max_file_size)?;
        }
        Ok(())
    }

    /// Flush the memtable and sync the WAL
    ///
    /// Dropping an engine does the same but can only log a failure.
    pub fn close(self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.flush()?;
        self.wal.lock().sync()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn storage_dir(&self) -> &Path {
        &self.paths.tables
    }

    pub fn wal_path(&self) -> &Path {
        &self.paths.wal
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    pub fn num_levels(&self) -> u32 {
        self.storage.num_levels()
    }

    /// Tables per level, level 0 first
    pub fn level_counts(&self) -> Vec<usize> {
        self.storage.level_counts()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "failed to close store on drop");
        }
    }
}

/// Iterator returned by [`Engine::scan`]
///
/// Tombstones are skipped; iteration stops at the exclusive upper bound or
/// after the first error.
pub struct DbIterator {
    merged: MergeIterator,
    upper: Option<Vec<u8>>,
    exhausted: bool,
}

impl Iterator for DbIterator {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let (key, value): Entry = match self.merged.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            };

            if self.upper.as_deref().is_some_and(|upper| key.as_slice() >= upper) {
                self.exhausted = true;
                return None;
            }
            if let Some(value) = value {
                return Some(Ok((key, value)));
            }
        }
        None
    }
}

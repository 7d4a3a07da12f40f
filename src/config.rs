//! Store configuration
//!
//! `ldb` builds a [`Config`] from `--db`, `--create_if_missing`,
//! `--disable_wal` and the tuning flags; tests and benches use the builder
//! directly.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::LdbError;

/// Options for one engine instance
///
/// On-disk layout under `data_dir`:
/// ```text
/// MANIFEST      level layout; its presence means the store exists
/// wal.log       unflushed writes
/// sstables/     table files
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub create_if_missing: bool,
    pub num_levels: u32,

    /// Memtable bytes that trigger a flush to level 0
    pub write_buffer_size: usize,

    /// Compaction starts a new output table once the current one reaches this
    pub max_file_size: u64,

    /// Compact level 0 away once it holds [`Config::L0_COMPACTION_TRIGGER`] tables
    pub auto_compaction: bool,

    /// Writes skip the log and rely on the flush at close
    pub disable_wal: bool,
    pub wal_sync_strategy: WalSyncStrategy,

    pub table: TableOptions,
}

/// Table format tuning
///
/// Parsed, validated and logged at open. Tables are written uncompressed
/// with a full key index, so none of these change the bytes on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub bloom_bits: Option<u32>,
    pub block_size: Option<u64>,
    pub compression: CompressionType,
}

/// When the WAL is fsynced
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    EveryWrite,
    /// After `count` appends; close always syncs the remainder
    EveryNEntries { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    #[default]
    No,
    Snappy,
    Zlib,
    Bzip2,
    Lz4,
    Lz4hc,
    Zstd,
}

const COMPRESSION_NAMES: [(CompressionType, &str); 7] = [
    (CompressionType::No, "no"),
    (CompressionType::Snappy, "snappy"),
    (CompressionType::Zlib, "zlib"),
    (CompressionType::Bzip2, "bzip2"),
    (CompressionType::Lz4, "lz4"),
    (CompressionType::Lz4hc, "lz4hc"),
    (CompressionType::Zstd, "zstd"),
];

impl CompressionType {
    /// Literal names accepted on the command line
    pub const NAMES: &'static [&'static str] =
        &["no", "snappy", "zlib", "bzip2", "lz4", "lz4hc", "zstd"];

    pub fn name(self) -> &'static str {
        COMPRESSION_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("no", |(_, name)| name)
    }
}

impl FromStr for CompressionType {
    type Err = LdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COMPRESSION_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| LdbError::Usage(format!("Unknown compression type: {}", s)))
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./ldb_data"),
            create_if_missing: false,
            num_levels: 7,
            write_buffer_size: 4 << 20,
            max_file_size: 2 << 20,
            auto_compaction: true,
            disable_wal: false,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            table: TableOptions::default(),
        }
    }
}

impl Config {
    pub const L0_COMPACTION_TRIGGER: usize = 4;

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    pub fn num_levels(mut self, levels: u32) -> Self {
        self.config.num_levels = levels;
        self
    }

    pub fn write_buffer_size(mut self, bytes: usize) -> Self {
        self.config.write_buffer_size = bytes;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn auto_compaction(mut self, enabled: bool) -> Self {
        self.config.auto_compaction = enabled;
        self
    }

    pub fn disable_wal(mut self, disable: bool) -> Self {
        self.config.disable_wal = disable;
        self
    }

    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    pub fn bloom_bits(mut self, bits: u32) -> Self {
        self.config.table.bloom_bits = Some(bits);
        self
    }

    pub fn block_size(mut self, bytes: u64) -> Self {
        self.config.table.block_size = Some(bytes);
        self
    }

    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.config.table.compression = compression;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

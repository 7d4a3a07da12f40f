//! Manifest
//!
//! Records which SSTables are live and at which level. The manifest file is
//! the marker for "this store exists".
//!
//! ## File Format
//! ```text
//! [CRC32 (4)][Len (4)][bincode(Manifest)]
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LdbError, Result};

/// Persistent level layout of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub num_levels: u32,
    pub next_table_id: u64,
    pub tables: Vec<TableRecord>,
}

/// One live SSTable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: u64,
    pub level: u32,
}

impl Manifest {
    pub const FILENAME: &'static str = "MANIFEST";

    pub fn new(num_levels: u32) -> Self {
        Self {
            num_levels,
            next_table_id: 1,
            tables: Vec::new(),
        }
    }

    /// Read and verify a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() < 8 {
            return Err(LdbError::Storage(format!(
                "Manifest too short: {}",
                path.display()
            )));
        }

        let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let body = bytes.get(8..8 + len).ok_or_else(|| {
            LdbError::Storage(format!("Manifest truncated: {}", path.display()))
        })?;

        if crc32fast::hash(body) != crc {
            return Err(LdbError::Storage(format!(
                "Manifest checksum mismatch: {}",
                path.display()
            )));
        }

        Ok(bincode::deserialize(body)?)
    }

    /// Atomically replace the manifest file (write temp, fsync, rename)
    pub fn store(&self, path: &Path) -> Result<()> {
        let body = bincode::serialize(self)?;
        let tmp = path.with_extension("tmp");

        {
            let mut file = File::create(&tmp)?;
            file.write_all(&crc32fast::hash(&body).to_le_bytes())?;
            file.write_all(&(body.len() as u32).to_le_bytes())?;
            file.write_all(&body)?;
            file.sync_all()?;
        }

        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Number of tables at each level, index = level
    pub fn level_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_levels as usize];
        for table in &self.tables {
            if let Some(slot) = counts.get_mut(table.level as usize) {
                *slot += 1;
            }
        }
        counts
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_table_id;
        self.next_table_id += 1;
        id
    }
}

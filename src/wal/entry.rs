//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their on-disk
//! framing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{LdbError, Result};

/// Frame header size: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound for a single payload; anything larger is treated as corruption
pub const MAX_PAYLOAD_SIZE: u32 = 256 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Several puts applied atomically
    Batch { puts: Vec<(Vec<u8>, Vec<u8>)> },
}

impl Operation {
    /// Short uppercase name used when printing WAL contents
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Put { .. } => "PUT",
            Operation::Delete { .. } => "DELETE",
            Operation::Batch { .. } => "BATCH",
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Serialize into a framed record: `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&(self.timestamp, &self.operation))?;
        let len = payload.len() as u32;
        let crc = Self::compute_crc(self.lsn, len, &payload);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.put_u64_le(self.lsn);
        buf.put_u32_le(crc);
        buf.put_u32_le(len);
        buf.put_slice(&payload);
        Ok(buf)
    }

    /// Deserialize one framed record, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let (lsn, crc, len) = Self::parse_header(bytes)?;

        let total = HEADER_SIZE + len as usize;
        if bytes.len() < total {
            return Err(LdbError::WalCorruption(format!(
                "Truncated entry: expected {} bytes, got {}",
                total,
                bytes.len()
            )));
        }

        let payload = &bytes[HEADER_SIZE..total];
        let actual = Self::compute_crc(lsn, len, payload);
        if actual != crc {
            return Err(LdbError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                lsn, crc, actual
            )));
        }

        let (timestamp, operation): (u64, Operation) = bincode::deserialize(payload)?;

        Ok(Self {
            lsn,
            operation,
            timestamp,
        })
    }

    /// Decode the fixed-size header: (lsn, crc, payload length)
    pub fn parse_header(bytes: &[u8]) -> Result<(u64, u32, u32)> {
        if bytes.len() < HEADER_SIZE {
            return Err(LdbError::WalCorruption(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64_le();
        let crc = header.get_u32_le();
        let len = header.get_u32_le();

        if len > MAX_PAYLOAD_SIZE {
            return Err(LdbError::WalCorruption(format!(
                "Payload length {} exceeds maximum {}",
                len, MAX_PAYLOAD_SIZE
            )));
        }

        Ok((lsn, crc, len))
    }

    /// CRC32 over the LSN, the payload length and the payload
    pub fn compute_crc(lsn: u64, len: u32, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(&len.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}

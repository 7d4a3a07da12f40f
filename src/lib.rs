//! # ldbkit
//!
//! Maintenance and inspection tooling for an embedded, ordered LSM key-value
//! store, plus the store itself:
//! - Binary-safe keys and values on the command line (raw text or `0x` hex)
//! - Half-open range scans, dump streams and bulk loads
//! - Manual compaction, level reduction and WAL inspection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ldb (argv, stdin)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │          Command Router (schema table, validation)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ open / get / put / scan / compact / close
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! └──────┬─────────────────────┬────────────────────────────────┘
//!        │                     │
//!        ▼                     ▼
//!   ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐
//!   │     WAL     │     │  MemTable   │────▶│ Storage (leveled │
//!   │  (Append)   │     │  (RwLock)   │     │ SSTables, MANIFEST)
//!   └─────────────┘     └─────────────┘     └──────────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod memtable;
pub mod storage;
pub mod wal;

pub use config::Config;
pub use engine::Engine;
pub use error::{LdbError, Result};

/// Crate version, reported by `ldb --version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for ldbkit
//!
//! One error enum covers the command layer and the storage engine beneath it.
//! Every variant is fatal for the invocation that raised it.

use thiserror::Error;

/// Result type alias using LdbError
pub type Result<T> = std::result::Result<T, LdbError>;

/// Unified error type for ldbkit operations
#[derive(Debug, Error)]
pub enum LdbError {
    // -------------------------------------------------------------------------
    // Command-Line Errors
    // -------------------------------------------------------------------------
    /// Bad, missing or inapplicable flags, wrong positional arity, missing --db
    #[error("{0}")]
    Usage(String),

    /// `--help` / `--version` output; not a failure
    #[error("{0}")]
    Help(String),

    /// Malformed hex literal
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    /// A scan produced zero rows
    #[error("No keys found in the requested range")]
    EmptyResult,

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open store at {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Administrative operation rejected by the engine
    #[error("Engine error: {0}")]
    Engine(String),
}

impl LdbError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            LdbError::Help(_) => 0,
            _ => 1,
        }
    }
}

impl From<bincode::Error> for LdbError {
    fn from(err: bincode::Error) -> Self {
        LdbError::Serialization(err.to_string())
    }
}

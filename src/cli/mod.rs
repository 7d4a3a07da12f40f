//! Command layer for the `ldb` tool
//!
//! Everything between the argument vector and the engine call interface:
//! - `codec`: raw / `0x` hex conversion of keys and values
//! - `schema`: per-command capability table and the clap tree built from it
//! - `router`: validation, dispatch and handle lifetime
//! - `scan`, `dump`, `admin`: command handlers

pub mod admin;
pub mod codec;
pub mod command;
pub mod dump;
pub mod router;
pub mod scan;
pub mod schema;

pub use codec::{Encoding, EncodingMode};
pub use command::Command;
pub use router::{execute, parse, run_with_io, Invocation, StoreOptions};
pub use scan::{KeyRange, RangeScanner};
pub use schema::CommandKind;

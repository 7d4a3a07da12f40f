//! Dump stream
//!
//! The dump stream is the backup format of a store: one pair per line,
//! ascending key order, key and value separated by the literal ` ==> `.
//!
//! ```text
//! x1 ==> y1
//! x2 ==> y2
//! ```
//!
//! With hex encoding both halves are `0x`-prefixed hex and the stream is
//! binary safe. In raw mode a key containing ` ==> ` or a value containing a
//! newline cannot be reloaded faithfully.

use std::io::{BufRead, Write};

use crate::engine::Engine;
use crate::error::{LdbError, Result};

use super::codec::{decode_bytes, encode_bytes, EncodingMode};
use super::scan::{KeyRange, RangeScanner};

/// Separator between key and value on a dump line
pub const SEPARATOR: &str = " ==> ";

/// Prefix of the count line written by `dump --count_only`
pub const COUNT_PREFIX: &str = "Keys in range:";

/// Outcome of a load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: u64,
    /// Lines without a separator that were not recognised and skipped
    pub bad_lines: u64,
}

/// Write one dump record (without the newline)
pub fn write_record(
    out: &mut dyn Write,
    key: &[u8],
    value: &[u8],
    mode: EncodingMode,
) -> Result<()> {
    out.write_all(&encode_bytes(key, mode))?;
    out.write_all(SEPARATOR.as_bytes())?;
    out.write_all(&encode_bytes(value, mode))?;
    Ok(())
}

/// Split a dump line on the first separator and decode both halves
///
/// `Ok(None)` means the line has no separator.
pub fn parse_record(line: &[u8], mode: EncodingMode) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    let sep = SEPARATOR.as_bytes();
    let pos = match line.windows(sep.len()).position(|w| w == sep) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let key = decode_bytes(&line[..pos], mode)?;
    let value = decode_bytes(&line[pos + sep.len()..], mode)?;
    Ok(Some((key, value)))
}

/// Handler for `dump`: stream the range, or only its size with `count_only`
///
/// An empty range is a valid, empty dump.
pub fn dump(
    engine: &Engine,
    range: &KeyRange,
    max_keys: Option<u64>,
    mode: EncodingMode,
    count_only: bool,
    out: &mut dyn Write,
) -> Result<u64> {
    let mut count = 0;
    for item in RangeScanner::new(engine, range, max_keys)? {
        let (key, value) = item?;
        if !count_only {
            write_record(out, &key, &value, mode)?;
            out.write_all(b"\n")?;
        }
        count += 1;
    }

    if count_only {
        writeln!(out, "{} {}", COUNT_PREFIX, count)?;
    }

    tracing::debug!(count, count_only, "dump finished");
    Ok(count)
}

/// Handler for `load`: replay a dump stream in file order
///
/// A line that fails to decode aborts the load; pairs before it stay written.
/// Replaying the same stream again is harmless because every write is an
/// upsert.
pub fn load(engine: &Engine, input: &mut dyn BufRead, mode: EncodingMode) -> Result<LoadStats> {
    let mut stats = LoadStats::default();
    let mut line = Vec::new();
    let mut line_no = 0u64;

    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        if line.is_empty() {
            continue;
        }

        match parse_record(&line, mode) {
            Ok(Some((key, value))) => {
                engine.put(&key, &value)?;
                stats.loaded += 1;
            }
            Ok(None) if line.starts_with(COUNT_PREFIX.as_bytes()) => {}
            Ok(None) => stats.bad_lines += 1,
            Err(LdbError::InvalidEncoding(reason)) => {
                return Err(LdbError::InvalidEncoding(format!("line {}: {}", line_no, reason)));
            }
            Err(e) => return Err(e),
        }
    }

    if stats.bad_lines > 0 {
        tracing::warn!(bad_lines = stats.bad_lines, "bad lines ignored during load");
    }
    tracing::debug!(loaded = stats.loaded, "load finished");
    Ok(stats)
}

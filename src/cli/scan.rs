//! Range scanning
//!
//! A range is `[from, to)`: the lower bound is inclusive, the upper bound is
//! exclusive, and a missing bound extends to that end of the keyspace.

use std::io::Write;

use crate::engine::{DbIterator, Engine};
use crate::error::{LdbError, Result};

use super::codec::{encode_bytes, Encoding};

/// Half-open key range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub from: Option<Vec<u8>>,
    pub to: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn new(from: Option<Vec<u8>>, to: Option<Vec<u8>>) -> Self {
        Self { from, to }
    }

    /// The whole keyspace
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let above = self.from.as_deref().map_or(true, |from| key >= from);
        let below = self.to.as_deref().map_or(true, |to| key < to);
        above && below
    }
}

/// Lazy ascending scan over a range, capped at `max_keys` pairs
pub struct RangeScanner {
    inner: DbIterator,
    /// Pairs still allowed; `None` is unbounded
    remaining: Option<u64>,
}

impl RangeScanner {
    pub fn new(engine: &Engine, range: &KeyRange, max_keys: Option<u64>) -> Result<Self> {
        let inner = engine.scan(range.from.as_deref(), range.to.as_deref())?;
        Ok(Self {
            inner,
            remaining: max_keys,
        })
    }
}

impl Iterator for RangeScanner {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        let item = self.inner.next()?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(item)
    }
}

/// Handler for `scan`: one `key : value` line per pair
///
/// An empty result is an error.
pub fn run_scan(
    engine: &Engine,
    range: &KeyRange,
    max_keys: Option<u64>,
    encoding: Encoding,
    out: &mut dyn Write,
) -> Result<u64> {
    let mut count = 0;
    for item in RangeScanner::new(engine, range, max_keys)? {
        let (key, value) = item?;
        out.write_all(&encode_bytes(&key, encoding.key))?;
        out.write_all(b" : ")?;
        out.write_all(&encode_bytes(&value, encoding.value))?;
        out.write_all(b"\n")?;
        count += 1;
    }

    if count == 0 {
        return Err(LdbError::EmptyResult);
    }
    Ok(count)
}

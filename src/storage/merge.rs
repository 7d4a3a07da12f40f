//! Merging Iterator
//!
//! Combines several sorted sources into one sorted stream. Sources are given
//! newest first; when several carry the same key, the newest one wins and
//! the older entries are skipped.

use crate::error::Result;

/// `(key, value)`; a `None` value is a tombstone
pub type Entry = (Vec<u8>, Option<Vec<u8>>);

/// One sorted input of a merge
pub type Source = Box<dyn Iterator<Item = Result<Entry>>>;

/// K-way merge over sorted sources
pub struct MergeIterator {
    sources: Vec<Source>,
    /// Current front entry of each source
    heads: Vec<Option<Entry>>,
    primed: bool,
    failed: bool,
}

impl MergeIterator {
    /// `sources[0]` has the highest precedence
    pub fn new(sources: Vec<Source>) -> Self {
        let heads = vec![None; sources.len()];
        Self {
            sources,
            heads,
            primed: false,
            failed: false,
        }
    }

    fn advance(&mut self, i: usize) -> Result<()> {
        self.heads[i] = self.sources[i].next().transpose()?;
        Ok(())
    }

    fn step(&mut self) -> Result<Option<Entry>> {
        if !self.primed {
            for i in 0..self.sources.len() {
                self.advance(i)?;
            }
            self.primed = true;
        }

        let min_key = match self.heads.iter().flatten().map(|(k, _)| k).min() {
            Some(k) => k.clone(),
            None => return Ok(None),
        };

        let mut winner = None;
        for i in 0..self.heads.len() {
            if matches!(&self.heads[i], Some((k, _)) if *k == min_key) {
                let entry = self.heads[i].take();
                if winner.is_none() {
                    winner = entry;
                }
                self.advance(i)?;
            }
        }

        Ok(winner)
    }
}

impl Iterator for MergeIterator {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.step() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

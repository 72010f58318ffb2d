//! Equal, contiguous split of the global array across participants.
use crate::{Error, Result};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    len: usize,
    participants: u32,
    chunk_size: usize,
}

impl Partition {
    /// Split `len` elements across `participants` ranks.
    ///
    /// Every rank gets exactly `len / participants` elements, so the split
    /// must be exact and non-empty.
    pub fn new(len: usize, participants: u32) -> Result<Self> {
        let parts = participants as usize;
        if parts == 0 || len == 0 || len % parts != 0 {
            return Err(Error::Configuration { len, participants });
        }
        Ok(Partition {
            len,
            participants,
            chunk_size: len / parts,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn participants(&self) -> u32 {
        self.participants
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// First global index owned by `rank`.
    pub fn offset(&self, rank: u32) -> usize {
        debug_assert!(rank < self.participants);
        rank as usize * self.chunk_size
    }

    pub fn range(&self, rank: u32) -> Range<usize> {
        let start = self.offset(rank);
        start..start + self.chunk_size
    }

    /// Ranges of every rank, in rank order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.participants).map(move |rank| self.range(rank))
    }
}

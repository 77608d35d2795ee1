//! Tuning parameters for node layouts and memory.

use crate::error::{Error, Result};
use crate::key::FANOUT;

/// Configuration for a [`TrieSet`](crate::TrieSet) or [`TrieMap`](crate::TrieMap).
///
/// The thresholds only decide how a node stores its slots. Membership, counts and
/// ordering are identical for every valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Largest occupancy stored as a sorted digit list.
    pub sparse_max: usize,
    /// A bitmap node shrinks back to a sorted list at or below this occupancy.
    pub sparse_demote: usize,
    /// Largest occupancy stored as a bitmap; above it a node is direct-indexed.
    pub bitmap_max: usize,
    /// A direct-indexed node shrinks back to a bitmap at or below this occupancy.
    pub bitmap_demote: usize,
    /// Optional ceiling on bytes attributed to the trie.
    pub memory_limit: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sparse_max: 16,
            sparse_demote: 8,
            bitmap_max: 160,
            bitmap_demote: 128,
            memory_limit: None,
        }
    }
}

impl Config {
    /// Set the byte ceiling.
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Set all four layout thresholds at once.
    pub fn with_thresholds(
        mut self,
        sparse_max: usize,
        sparse_demote: usize,
        bitmap_max: usize,
        bitmap_demote: usize,
    ) -> Self {
        self.sparse_max = sparse_max;
        self.sparse_demote = sparse_demote;
        self.bitmap_max = bitmap_max;
        self.bitmap_demote = bitmap_demote;
        self
    }

    /// Check the threshold ordering every node layout relies on.
    pub fn validate(&self) -> Result<()> {
        // A prefix split always produces a two-child sparse node.
        if self.sparse_max < 2 {
            return Err(Error::InvalidConfig("sparse_max must be at least 2"));
        }
        if self.sparse_demote >= self.sparse_max {
            return Err(Error::InvalidConfig(
                "sparse_demote must be below sparse_max",
            ));
        }
        if self.bitmap_max <= self.sparse_max || self.bitmap_max > FANOUT {
            return Err(Error::InvalidConfig(
                "bitmap_max must be above sparse_max and at most 256",
            ));
        }
        if self.bitmap_demote <= self.sparse_demote || self.bitmap_demote >= self.bitmap_max {
            return Err(Error::InvalidConfig(
                "bitmap_demote must lie between sparse_demote and bitmap_max",
            ));
        }
        Ok(())
    }
}

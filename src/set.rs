//! Presence-only variant: an ordered set of `u64` keys.

use std::fmt;
use std::ops::RangeBounds;

use crate::config::Config;
use crate::error::Result;
use crate::iter::{Cursor, SetIter};
use crate::key;
use crate::stats::TrieStats;
use crate::trie::RawTrie;

/// Ordered set of 64-bit keys with range counting and rank selection.
///
/// # Example
///
/// ```rust
/// use cardinal_trie::TrieSet;
///
/// let mut set = TrieSet::new();
/// assert_eq!(set.set(20), Ok(true));
/// assert_eq!(set.set(20), Ok(false));
/// set.set(40).unwrap();
///
/// assert_eq!(set.count_range(0, 30), 1);
/// assert_eq!(set.next(20), Some(40));
/// assert_eq!(set.by_count(2), Some(40));
/// ```
pub struct TrieSet {
    pub(crate) trie: RawTrie<()>,
}

impl TrieSet {
    /// Empty set with the default [`Config`].
    pub fn new() -> Self {
        Self {
            trie: RawTrie::new(Config::default()),
        }
    }

    /// Empty set with custom thresholds or a memory limit.
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            trie: RawTrie::with_config(config)?,
        })
    }

    /// The configuration this set was built with.
    pub fn config(&self) -> &Config {
        &self.trie.config
    }

    /// Add `key`. Returns `true` if it was not present before.
    ///
    /// Fails only when allocation fails, in which case the set is unchanged.
    pub fn set(&mut self, key: u64) -> Result<bool> {
        Ok(self.trie.insert(key, ())?.is_none())
    }

    /// Remove `key`. Returns `true` if it was present.
    pub fn unset(&mut self, key: u64) -> bool {
        self.trie.remove(key).is_some()
    }

    /// Whether `key` is present.
    pub fn test(&self, key: u64) -> bool {
        self.trie.get(key).is_some()
    }

    /// Alias of [`TrieSet::test`].
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.test(key)
    }

    /// Number of keys present.
    #[inline]
    pub fn count_all(&self) -> u64 {
        self.trie.len()
    }

    /// Number of keys in `low..=high`; 0 when `low > high`.
    pub fn count_range(&self, low: u64, high: u64) -> u64 {
        self.trie.count_range(low, high)
    }

    /// Number of keys `<= key`.
    pub fn rank(&self, key: u64) -> u64 {
        self.trie.rank(key)
    }

    /// Smallest key `>= key`.
    pub fn first(&self, key: u64) -> Option<u64> {
        self.trie.first(key).map(|(k, _)| k)
    }

    /// Smallest key `> key`.
    pub fn next(&self, key: u64) -> Option<u64> {
        self.trie.next(key).map(|(k, _)| k)
    }

    /// Largest key `<= key`.
    pub fn last(&self, key: u64) -> Option<u64> {
        self.trie.last(key).map(|(k, _)| k)
    }

    /// Largest key `< key`.
    pub fn prev(&self, key: u64) -> Option<u64> {
        self.trie.prev(key).map(|(k, _)| k)
    }

    /// The `n`th smallest key, counting from 1.
    pub fn by_count(&self, n: u64) -> Option<u64> {
        self.trie.select(n).map(|(k, _)| k)
    }

    /// Bytes currently attributed to the set.
    #[inline]
    pub fn memory_used(&self) -> u64 {
        self.trie.memory_used()
    }

    /// Remove every key, returning the bytes reclaimed.
    pub fn free(&mut self) -> u64 {
        self.trie.free()
    }

    /// Number of keys present, as `usize`.
    #[inline]
    pub fn len(&self) -> usize {
        self.trie.len() as usize
    }

    /// Whether the set has no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trie.len() == 0
    }

    /// Keys in ascending order.
    pub fn iter(&self) -> SetIter<'_> {
        SetIter::new(Cursor::new(&self.trie, Some((0, u64::MAX))))
    }

    /// Keys within `range` in ascending order.
    pub fn range(&self, range: impl RangeBounds<u64>) -> SetIter<'_> {
        SetIter::new(Cursor::new(&self.trie, key::inclusive_bounds(range)))
    }

    /// Walk the set and summarize its shape.
    pub fn stats(&self) -> TrieStats {
        self.trie.stats()
    }
}

impl Default for TrieSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TrieSet {
    fn clone(&self) -> Self {
        Self {
            trie: self.trie.clone(),
        }
    }
}

impl fmt::Debug for TrieSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a TrieSet {
    type Item = u64;
    type IntoIter = SetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//! Mapped variant: an ordered map from `u64` keys to values.

use std::fmt;
use std::ops::RangeBounds;

use crate::config::Config;
use crate::error::Result;
use crate::iter::{Cursor, Iter, Keys, Values};
use crate::key;
use crate::stats::TrieStats;
use crate::trie::RawTrie;

/// Ordered map from 64-bit keys to `V`, with range counting and rank selection.
///
/// # Example
///
/// ```rust
/// use cardinal_trie::TrieMap;
///
/// let mut map = TrieMap::new();
/// for (k, v) in [(5, 50), (1, 10), (3, 30)] {
///     map.insert(k, v).unwrap();
/// }
///
/// assert_eq!(map.get(3), Some(&30));
/// assert_eq!(map.by_count(1), Some((1, &10)));
/// assert_eq!(map.next(3), Some((5, &50)));
/// assert_eq!(map.count_range(2, 5), 2);
/// ```
pub struct TrieMap<V> {
    pub(crate) trie: RawTrie<V>,
}

impl<V> TrieMap<V> {
    /// Empty map with the default [`Config`].
    pub fn new() -> Self {
        Self {
            trie: RawTrie::new(Config::default()),
        }
    }

    /// Empty map with custom thresholds or a memory limit.
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            trie: RawTrie::with_config(config)?,
        })
    }

    /// The configuration this map was built with.
    pub fn config(&self) -> &Config {
        &self.trie.config
    }

    /// Insert or overwrite the value for `key`, returning the previous value.
    ///
    /// Overwriting never allocates. Inserting a new key fails only when
    /// allocation fails, in which case the map is unchanged and `value` is dropped.
    pub fn insert(&mut self, key: u64, value: V) -> Result<Option<V>> {
        self.trie.insert(key, value)
    }

    /// Value stored under `key`.
    pub fn get(&self, key: u64) -> Option<&V> {
        self.trie.get(key)
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        self.trie.get_mut(key)
    }

    /// Whether `key` is present.
    pub fn test(&self, key: u64) -> bool {
        self.trie.get(key).is_some()
    }

    /// Alias of [`TrieMap::test`].
    #[inline]
    pub fn contains_key(&self, key: u64) -> bool {
        self.test(key)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        self.trie.remove(key)
    }

    /// Remove `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: u64) -> bool {
        self.trie.remove(key).is_some()
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

    /// Entry with the smallest key `>= key`.
    pub fn first(&self, key: u64) -> Option<(u64, &V)> {
        self.trie.first(key)
    }

    /// Entry with the smallest key `> key`.
    pub fn next(&self, key: u64) -> Option<(u64, &V)> {
        self.trie.next(key)
    }

    /// Entry with the largest key `<= key`.
    pub fn last(&self, key: u64) -> Option<(u64, &V)> {
        self.trie.last(key)
    }

    /// Entry with the largest key `< key`.
    pub fn prev(&self, key: u64) -> Option<(u64, &V)> {
        self.trie.prev(key)
    }

    /// The entry with the `n`th smallest key, counting from 1.
    pub fn by_count(&self, n: u64) -> Option<(u64, &V)> {
        self.trie.select(n)
    }

    /// Bytes currently attributed to the map.
    #[inline]
    pub fn memory_used(&self) -> u64 {
        self.trie.memory_used()
    }

    /// Remove every entry, returning the bytes reclaimed.
    pub fn free(&mut self) -> u64 {
        self.trie.free()
    }

    /// Number of entries, as `usize`.
    #[inline]
    pub fn len(&self) -> usize {
        self.trie.len() as usize
    }

    /// Whether the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trie.len() == 0
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.cursor(Some((0, u64::MAX))))
    }

    /// Entries with keys within `range`, in ascending key order.
    pub fn range(&self, range: impl RangeBounds<u64>) -> Iter<'_, V> {
        Iter::new(self.cursor(key::inclusive_bounds(range)))
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Keys<'_, V> {
        Keys::new(self.cursor(Some((0, u64::MAX))))
    }

    /// Values in ascending key order.
    pub fn values(&self) -> Values<'_, V> {
        Values::new(self.cursor(Some((0, u64::MAX))))
    }

    /// Walk the map and summarize its shape.
    pub fn stats(&self) -> TrieStats {
        self.trie.stats()
    }

    fn cursor(&self, bounds: Option<(u64, u64)>) -> Cursor<'_, V> {
        Cursor::new(&self.trie, bounds)
    }
}

impl<V> Default for TrieMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for TrieMap<V> {
    fn clone(&self) -> Self {
        Self {
            trie: self.trie.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for TrieMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a TrieMap<V> {
    type Item = (u64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//! Ordered iteration over sets and maps.
//!
//! Iterators keep only the inclusive range of keys still to visit. Each step is
//! one successor or predecessor search, and the remaining length is a range
//! count, so iterating never copies out the key set.

use std::fmt;
use std::iter::FusedIterator;

use crate::trie::RawTrie;

/// Shared state of every iterator: the trie and the keys not yet yielded.
pub(crate) struct Cursor<'a, V> {
    trie: &'a RawTrie<V>,
    /// Inclusive bounds still to visit, `None` once exhausted.
    bounds: Option<(u64, u64)>,
}

impl<'a, V> Cursor<'a, V> {
    pub(crate) fn new(trie: &'a RawTrie<V>, bounds: Option<(u64, u64)>) -> Self {
        Self { trie, bounds }
    }

    fn step_front(&mut self) -> Option<(u64, &'a V)> {
        let (low, high) = self.bounds?;
        match self.trie.first(low) {
            Some((key, value)) if key <= high => {
                self.bounds = if key == high {
                    None
                } else {
                    Some((key + 1, high))
                };
                Some((key, value))
            }
            _ => {
                self.bounds = None;
                None
            }
        }
    }

    fn step_back(&mut self) -> Option<(u64, &'a V)> {
        let (low, high) = self.bounds?;
        match self.trie.last(high) {
            Some((key, value)) if key >= low => {
                self.bounds = if key == low {
                    None
                } else {
                    Some((low, key - 1))
                };
                Some((key, value))
            }
            _ => {
                self.bounds = None;
                None
            }
        }
    }

    fn remaining(&self) -> usize {
        self.bounds
            .map_or(0, |(low, high)| self.trie.count_range(low, high) as usize)
    }
}

impl<V> Clone for Cursor<'_, V> {
    fn clone(&self) -> Self {
        Self {
            trie: self.trie,
            bounds: self.bounds,
        }
    }
}

macro_rules! cursor_iterator {
    ($name:ty, [$($gen:tt)*], $item:ty, |$pair:pat_param| $map:expr) => {
        impl<$($gen)*> Iterator for $name {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<Self::Item> {
                self.cursor.step_front().map(|$pair| $map)
            }

            #[inline]
            fn size_hint(&self) -> (usize, Option<usize>) {
                let len = self.cursor.remaining();
                (len, Some(len))
            }
        }

        impl<$($gen)*> DoubleEndedIterator for $name {
            #[inline]
            fn next_back(&mut self) -> Option<Self::Item> {
                self.cursor.step_back().map(|$pair| $map)
            }
        }

        impl<$($gen)*> ExactSizeIterator for $name {
            fn len(&self) -> usize {
                self.cursor.remaining()
            }
        }

        impl<$($gen)*> FusedIterator for $name {}

        impl<$($gen)*> Clone for $name {
            fn clone(&self) -> Self {
                Self {
                    cursor: self.cursor.clone(),
                }
            }
        }
    };
}

/// Keys of a [`TrieSet`](crate::TrieSet) in ascending order.
pub struct SetIter<'a> {
    cursor: Cursor<'a, ()>,
}

impl<'a> SetIter<'a> {
    pub(crate) fn new(cursor: Cursor<'a, ()>) -> Self {
        Self { cursor }
    }
}

cursor_iterator!(SetIter<'a>, ['a], u64, |(key, _)| key);

/// Entries of a [`TrieMap`](crate::TrieMap) in ascending key order.
pub struct Iter<'a, V> {
    cursor: Cursor<'a, V>,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(cursor: Cursor<'a, V>) -> Self {
        Self { cursor }
    }
}

cursor_iterator!(Iter<'a, V>, ['a, V], (u64, &'a V), |entry| entry);

/// Keys of a [`TrieMap`](crate::TrieMap) in ascending order.
pub struct Keys<'a, V> {
    cursor: Cursor<'a, V>,
}

impl<'a, V> Keys<'a, V> {
    pub(crate) fn new(cursor: Cursor<'a, V>) -> Self {
        Self { cursor }
    }
}

cursor_iterator!(Keys<'a, V>, ['a, V], u64, |(key, _)| key);

/// Values of a [`TrieMap`](crate::TrieMap) in ascending key order.
pub struct Values<'a, V> {
    cursor: Cursor<'a, V>,
}

impl<'a, V> Values<'a, V> {
    pub(crate) fn new(cursor: Cursor<'a, V>) -> Self {
        Self { cursor }
    }
}

cursor_iterator!(Values<'a, V>, ['a, V], &'a V, |(_, value)| value);

impl fmt::Debug for SetIter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<V: fmt::Debug> fmt::Debug for Iter<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.clone()).finish()
    }
}

impl<V> fmt::Debug for Keys<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<V: fmt::Debug> fmt::Debug for Values<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn trie(keys: &[u64]) -> RawTrie<u64> {
        let mut trie = RawTrie::new(Config::default());
        for &k in keys {
            trie.insert(k, k.wrapping_add(1)).unwrap();
        }
        trie
    }

    #[test]
    fn test_forward_and_backward() {
        let trie = trie(&[9, 1, 1 << 33, 5, u64::MAX - 1]);
        let all = Some((0, u64::MAX));

        let forward: Vec<u64> = Keys::new(Cursor::new(&trie, all)).collect();
        assert_eq!(forward, vec![1, 5, 9, 1 << 33, u64::MAX - 1]);

        let backward: Vec<u64> = Keys::new(Cursor::new(&trie, all)).rev().collect();
        assert_eq!(backward, vec![u64::MAX - 1, 1 << 33, 9, 5, 1]);

        let values: Vec<u64> = Values::new(Cursor::new(&trie, all)).copied().collect();
        assert_eq!(values, vec![2, 6, 10, (1 << 33) + 1, u64::MAX]);
    }

    #[test]
    fn test_meeting_in_the_middle() {
        let trie = trie(&[1, 2, 3, 4]);
        let mut iter = Iter::new(Cursor::new(&trie, Some((0, u64::MAX))));
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some((1, &2)));
        assert_eq!(iter.next_back(), Some((4, &5)));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next_back(), Some((3, &4)));
        assert_eq!(iter.next(), Some((2, &3)));
        assert_eq!(iter.len(), 0);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_bounds() {
        let trie = trie(&(0..50).collect::<Vec<_>>());
        let keys: Vec<u64> = Keys::new(Cursor::new(&trie, Some((10, 14)))).collect();
        assert_eq!(keys, vec![10, 11, 12, 13, 14]);
        assert_eq!(Keys::new(Cursor::new(&trie, Some((100, 200)))).len(), 0);
        assert_eq!(Keys::new(Cursor::new(&trie, None)).next(), None);
    }

    #[test]
    fn test_extremes() {
        let trie = trie(&[0, u64::MAX]);
        let all = Some((0, u64::MAX));
        assert_eq!(Keys::new(Cursor::new(&trie, all)).collect::<Vec<_>>(), vec![0, u64::MAX]);
        assert_eq!(
            Keys::new(Cursor::new(&trie, all)).rev().collect::<Vec<_>>(),
            vec![u64::MAX, 0]
        );
    }

    #[test]
    fn test_debug() {
        let trie = trie(&[3, 7]);
        let iter = Iter::new(Cursor::new(&trie, Some((0, u64::MAX))));
        assert_eq!(format!("{iter:?}"), "{3: 4, 7: 8}");
    }
}

//! The navigation engine shared by [`TrieSet`](crate::TrieSet) and
//! [`TrieMap`](crate::TrieMap).
//!
//! Every operation walks the key's digits from the root, consuming each node's
//! compressed prefix. Insert and remove change the structure of exactly one node
//! (plus a merge on the way back up after a removal) and adjust the cached counts
//! of its ancestors only once that change has succeeded.
//!
//! Paths are at most 8 levels deep, so the recursive helpers here are bounded.

use std::cmp::Ordering;
use std::mem;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Result;
use crate::key;
use crate::memory::{self, MemoryAccounting};
use crate::node::{Kind, Node, Prefix, Slots};
use crate::stats::TrieStats;

pub(crate) struct RawTrie<V> {
    pub(crate) root: Option<Box<Node<V>>>,
    pub(crate) memory: MemoryAccounting,
    pub(crate) config: Config,
}

impl<V> RawTrie<V> {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            root: None,
            memory: MemoryAccounting::new(config.memory_limit),
            config,
        }
    }

    pub(crate) fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        debug!(?config, "configured trie");
        Ok(Self::new(config))
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.root.as_ref().map_or(0, |root| root.count)
    }

    #[inline]
    pub(crate) fn memory_used(&self) -> u64 {
        self.memory.used()
    }

    pub(crate) fn get(&self, key: u64) -> Option<&V> {
        let mut node = self.root.as_deref()?;
        let mut depth = 0;
        loop {
            if node.mismatch(key, depth).is_some() {
                return None;
            }
            let level = node.level(depth);
            let digit = key::digit(key, level);
            match &node.kind {
                Kind::Leaf(slots) => return slots.get(digit),
                Kind::Branch(slots) => {
                    node = &**slots.get(digit)?;
                    depth = level + 1;
                }
            }
        }
    }

    pub(crate) fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        get_mut_at(self.root.as_deref_mut()?, key, 0)
    }

    /// Insert or overwrite, returning the previous value.
    pub(crate) fn insert(&mut self, key: u64, value: V) -> Result<Option<V>> {
        let config = self.config;
        match self.root.as_deref_mut() {
            Some(root) => insert_at(root, key, value, 0, &config, &mut self.memory),
            None => {
                let mut charge = self.memory.charge();
                let leaf = Node::try_leaf(key, 0, value, &mut charge)?;
                self.memory.record(0, leaf.footprint());
                self.root = Some(leaf);
                Ok(None)
            }
        }
    }

    pub(crate) fn remove(&mut self, key: u64) -> Option<V> {
        let config = self.config;
        let value = remove_at(self.root.as_deref_mut()?, key, 0, &config, &mut self.memory)?;
        if self.len() == 0 {
            if let Some(root) = self.root.take() {
                self.memory.record(root.footprint(), 0);
            }
        }
        Some(value)
    }

    /// Smallest key `>= key`.
    pub(crate) fn first(&self, key: u64) -> Option<(u64, &V)> {
        seek_ge(self.root.as_deref()?, key, 0, 0)
    }

    /// Largest key `<= key`.
    pub(crate) fn last(&self, key: u64) -> Option<(u64, &V)> {
        seek_le(self.root.as_deref()?, key, 0, 0)
    }

    /// Smallest key `> key`.
    pub(crate) fn next(&self, key: u64) -> Option<(u64, &V)> {
        self.first(key.checked_add(1)?)
    }

    /// Largest key `< key`.
    pub(crate) fn prev(&self, key: u64) -> Option<(u64, &V)> {
        self.last(key.checked_sub(1)?)
    }

    /// Number of keys `<= key`.
    pub(crate) fn rank(&self, key: u64) -> u64 {
        self.root.as_deref().map_or(0, |root| rank_at(root, key, 0))
    }

    /// Number of keys in `low..=high`.
    pub(crate) fn count_range(&self, low: u64, high: u64) -> u64 {
        if low > high {
            return 0;
        }
        let below = match low.checked_sub(1) {
            Some(before) => self.rank(before),
            None => 0,
        };
        self.rank(high) - below
    }

    /// The `n`th smallest key, counting from 1.
    pub(crate) fn select(&self, n: u64) -> Option<(u64, &V)> {
        if n == 0 || n > self.len() {
            return None;
        }
        select_at(self.root.as_deref()?, n - 1, 0, 0)
    }

    /// Release every node, returning the bytes reclaimed.
    pub(crate) fn free(&mut self) -> u64 {
        let keys = self.len();
        drop(self.root.take());
        let bytes = self.memory.reset();
        debug!(keys, bytes, "freed trie");
        bytes
    }

    pub(crate) fn stats(&self) -> TrieStats {
        let mut stats = TrieStats {
            keys: self.len(),
            memory_used: self.memory_used(),
            ..TrieStats::default()
        };
        if let Some(root) = self.root.as_deref() {
            stats.visit(root);
        }
        stats
    }
}

impl<V: Clone> Clone for RawTrie<V> {
    fn clone(&self) -> Self {
        let root = self.root.clone();
        let mut memory = MemoryAccounting::new(self.config.memory_limit);
        // Cloned slot arrays are sized to their contents, not the source's capacity.
        memory.set_used(root.as_deref().map_or(0, Node::total_footprint));
        Self {
            root,
            memory,
            config: self.config,
        }
    }
}

// =============================================================================
// Mutation
// =============================================================================

fn get_mut_at<V>(node: &mut Node<V>, key: u64, depth: usize) -> Option<&mut V> {
    if node.mismatch(key, depth).is_some() {
        return None;
    }
    let level = node.level(depth);
    let digit = key::digit(key, level);
    match &mut node.kind {
        Kind::Leaf(slots) => slots.get_mut(digit),
        Kind::Branch(slots) => get_mut_at(slots.get_mut(digit)?, key, level + 1),
    }
}

fn insert_at<V>(
    node: &mut Node<V>,
    key: u64,
    value: V,
    depth: usize,
    config: &Config,
    memory: &mut MemoryAccounting,
) -> Result<Option<V>> {
    if let Some(at) = node.mismatch(key, depth) {
        split(node, key, value, depth, at, memory)?;
        return Ok(None);
    }

    let level = node.level(depth);
    let digit = key::digit(key, level);
    let before = node.footprint();
    let mut charge = memory.charge();
    let added = match &mut node.kind {
        Kind::Leaf(slots) => match slots.get_mut(digit) {
            Some(slot) => return Ok(Some(mem::replace(slot, value))),
            None => slots
                .try_insert(digit, value, config, &mut charge)
                .map(|()| 0),
        },
        Kind::Branch(slots) => {
            if let Some(child) = slots.get_mut(digit) {
                let old = insert_at(child, key, value, level + 1, config, memory)?;
                if old.is_none() {
                    node.count += 1;
                }
                return Ok(old);
            }
            let leaf = Node::try_leaf(key, level + 1, value, &mut charge)?;
            let leaf_bytes = leaf.footprint();
            slots
                .try_insert(digit, leaf, config, &mut charge)
                .map(|()| leaf_bytes)
        }
    };

    // A failed insert may still have grown a slot array's capacity.
    let after = node.footprint() + added.as_ref().copied().unwrap_or(0);
    memory.record(before, after);
    added?;
    node.count += 1;
    Ok(None)
}

/// Split `node` where its prefix diverges from `key` at index `at`: a new branch
/// takes the shared part of the prefix and holds the old node and a new leaf.
fn split<V>(
    node: &mut Node<V>,
    key: u64,
    value: V,
    depth: usize,
    at: usize,
    memory: &mut MemoryAccounting,
) -> Result<()> {
    let level = depth + at;
    let mut charge = memory.charge();
    let leaf = Node::try_leaf(key, level + 1, value, &mut charge)?;
    let mut slots = Slots::try_reserved(2, &mut charge)?;
    let mut old = memory::try_box(&mut charge, Node::placeholder())?;

    let before = node.footprint();
    let leaf_bytes = leaf.footprint();
    mem::swap(&mut *old, node);

    let old_digit = old.prefix[at];
    let new_digit = key::digit(key, level);
    let prefix = Prefix::from_slice(&old.prefix[..at]);
    old.prefix.drain(..=at);
    let count = old.count + 1;
    if old_digit < new_digit {
        slots.push_reserved(old_digit, old);
        slots.push_reserved(new_digit, leaf);
    } else {
        slots.push_reserved(new_digit, leaf);
        slots.push_reserved(old_digit, old);
    }
    *node = Node {
        prefix,
        count,
        kind: Kind::Branch(slots),
    };
    trace!(level, "split compressed prefix");

    // The old node moved into a new box with its footprint unchanged.
    memory.record(before, node.footprint() + before + leaf_bytes);
    Ok(())
}

fn remove_at<V>(
    node: &mut Node<V>,
    key: u64,
    depth: usize,
    config: &Config,
    memory: &mut MemoryAccounting,
) -> Option<V> {
    if node.mismatch(key, depth).is_some() {
        return None;
    }
    let level = node.level(depth);
    let digit = key::digit(key, level);
    let before = node.footprint();
    let value = match &mut node.kind {
        Kind::Leaf(slots) => slots.remove(digit, config, &mut memory.charge())?,
        Kind::Branch(slots) => {
            let child = slots.get_mut(digit)?;
            let value = remove_at(child, key, level + 1, config, memory)?;
            if child.count == 0 {
                if let Some(child) = slots.remove(digit, config, &mut memory.charge()) {
                    memory.record(child.footprint(), 0);
                }
            }
            value
        }
    };
    node.count -= 1;
    memory.record(before, node.footprint());

    if matches!(node.kind, Kind::Branch(_)) && node.slot_count() == 1 {
        merge(node, config, memory);
    }
    Some(value)
}

/// Fold a branch with a single child into that child.
fn merge<V>(node: &mut Node<V>, config: &Config, memory: &mut MemoryAccounting) {
    let before = node.footprint();
    let Kind::Branch(slots) = &mut node.kind else {
        return;
    };
    let Some(digit) = slots.nth(0).map(|(digit, _)| digit) else {
        return;
    };
    let Some(child) = slots.remove(digit, config, &mut memory.charge()) else {
        return;
    };
    let child_bytes = child.footprint();
    let mut child = *child;

    let mut prefix = mem::take(&mut node.prefix);
    prefix.push(digit);
    prefix.extend_from_slice(&child.prefix);
    child.prefix = prefix;
    debug_assert_eq!(child.count, node.count);
    *node = child;
    trace!(prefix_len = node.prefix.len(), "merged single-child branch");

    memory.record(before + child_bytes, node.footprint());
}

// =============================================================================
// Navigation
// =============================================================================

/// Walk the prefix of `node` against `key`. `Some(ordering)` compares the
/// subtree as a whole with `key` when they diverge; `None` means the prefix
/// matched and `path` now holds it.
fn walk_prefix<V>(node: &Node<V>, key: u64, depth: usize, path: &mut u64) -> Option<Ordering> {
    for (i, &p) in node.prefix.iter().enumerate() {
        let level = depth + i;
        match p.cmp(&key::digit(key, level)) {
            Ordering::Equal => *path = key::with_digit(*path, level, p),
            diverged => return Some(diverged),
        }
    }
    None
}

fn seek_ge<V>(node: &Node<V>, key: u64, depth: usize, path: u64) -> Option<(u64, &V)> {
    let mut path = path;
    match walk_prefix(node, key, depth, &mut path) {
        Some(Ordering::Greater) => return min_at(node, depth, path),
        Some(_) => return None,
        None => {}
    }
    let level = node.level(depth);
    let digit = key::digit(key, level);
    match &node.kind {
        Kind::Leaf(slots) => {
            let (d, value) = slots.first_from(digit)?;
            Some((key::with_digit(path, level, d), value))
        }
        Kind::Branch(slots) => {
            if let Some(child) = slots.get(digit) {
                let found = seek_ge(child, key, level + 1, key::with_digit(path, level, digit));
                if found.is_some() {
                    return found;
                }
            }
            let (d, child) = slots.first_from(digit.checked_add(1)?)?;
            min_at(child, level + 1, key::with_digit(path, level, d))
        }
    }
}

fn seek_le<V>(node: &Node<V>, key: u64, depth: usize, path: u64) -> Option<(u64, &V)> {
    let mut path = path;
    match walk_prefix(node, key, depth, &mut path) {
        Some(Ordering::Less) => return max_at(node, depth, path),
        Some(_) => return None,
        None => {}
    }
    let level = node.level(depth);
    let digit = key::digit(key, level);
    match &node.kind {
        Kind::Leaf(slots) => {
            let (d, value) = slots.last_until(digit)?;
            Some((key::with_digit(path, level, d), value))
        }
        Kind::Branch(slots) => {
            if let Some(child) = slots.get(digit) {
                let found = seek_le(child, key, level + 1, key::with_digit(path, level, digit));
                if found.is_some() {
                    return found;
                }
            }
            let (d, child) = slots.last_until(digit.checked_sub(1)?)?;
            max_at(child, level + 1, key::with_digit(path, level, d))
        }
    }
}

/// Smallest key in the subtree of `node`.
fn min_at<V>(mut node: &Node<V>, mut depth: usize, mut path: u64) -> Option<(u64, &V)> {
    loop {
        for (i, &p) in node.prefix.iter().enumerate() {
            path = key::with_digit(path, depth + i, p);
        }
        let level = node.level(depth);
        match &node.kind {
            Kind::Leaf(slots) => {
                let (d, value) = slots.first_from(0)?;
                return Some((key::with_digit(path, level, d), value));
            }
            Kind::Branch(slots) => {
                let (d, child) = slots.first_from(0)?;
                path = key::with_digit(path, level, d);
                node = &**child;
                depth = level + 1;
            }
        }
    }
}

/// Largest key in the subtree of `node`.
fn max_at<V>(mut node: &Node<V>, mut depth: usize, mut path: u64) -> Option<(u64, &V)> {
    loop {
        for (i, &p) in node.prefix.iter().enumerate() {
            path = key::with_digit(path, depth + i, p);
        }
        let level = node.level(depth);
        match &node.kind {
            Kind::Leaf(slots) => {
                let (d, value) = slots.last_until(u8::MAX)?;
                return Some((key::with_digit(path, level, d), value));
            }
            Kind::Branch(slots) => {
                let (d, child) = slots.last_until(u8::MAX)?;
                path = key::with_digit(path, level, d);
                node = &**child;
                depth = level + 1;
            }
        }
    }
}

// =============================================================================
// Counting
// =============================================================================

fn rank_at<V>(node: &Node<V>, key: u64, depth: usize) -> u64 {
    let mut path = 0;
    match walk_prefix(node, key, depth, &mut path) {
        Some(Ordering::Less) => return node.count,
        Some(_) => return 0,
        None => {}
    }
    let level = node.level(depth);
    let digit = key::digit(key, level);
    match &node.kind {
        Kind::Leaf(slots) => {
            (slots.count_below(digit) + usize::from(slots.get(digit).is_some())) as u64
        }
        Kind::Branch(slots) => {
            let below: u64 = slots
                .iter()
                .take_while(|&(d, _)| d < digit)
                .map(|(_, child)| child.count)
                .sum();
            below + slots.get(digit).map_or(0, |child| rank_at(child, key, level + 1))
        }
    }
}

/// Key at 0-based position `nth` within the subtree of `node`.
fn select_at<V>(node: &Node<V>, mut nth: u64, depth: usize, path: u64) -> Option<(u64, &V)> {
    debug_assert!(nth < node.count);
    let mut path = path;
    for (i, &p) in node.prefix.iter().enumerate() {
        path = key::with_digit(path, depth + i, p);
    }
    let level = node.level(depth);
    match &node.kind {
        Kind::Leaf(slots) => {
            let (d, value) = slots.nth(usize::try_from(nth).ok()?)?;
            Some((key::with_digit(path, level, d), value))
        }
        Kind::Branch(slots) => {
            for (d, child) in slots.iter() {
                if nth < child.count {
                    return select_at(child, nth, level + 1, key::with_digit(path, level, d));
                }
                nth -= child.count;
            }
            None
        }
    }
}

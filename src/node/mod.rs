//! Trie nodes.
//!
//! A node starts with a compressed prefix: the run of digits between its parent's
//! branching digit and its own branching level. Below that, a branch holds child
//! nodes and a leaf holds values keyed by the final digit. Every node caches the
//! number of keys stored beneath it.
//!
//! After a mutation completes, every branch has at least two children and every
//! leaf at least one value; single-child chains are folded into prefixes.

mod slots;

use std::mem;

use smallvec::SmallVec;

pub(crate) use slots::Repr;
pub(crate) use slots::Slots;

use crate::error::Result;
use crate::key::{self, LEAF_LEVEL};
use crate::memory::{self, Charge};

/// Compressed prefix. At most 7 digits precede the final one, so it never spills.
pub(crate) type Prefix = SmallVec<[u8; 7]>;

#[derive(Clone)]
pub(crate) struct Node<V> {
    pub(crate) prefix: Prefix,
    /// Keys stored in this subtree.
    pub(crate) count: u64,
    pub(crate) kind: Kind<V>,
}

#[derive(Clone)]
pub(crate) enum Kind<V> {
    Branch(Slots<Box<Node<V>>>),
    Leaf(Slots<V>),
}

impl<V> Node<V> {
    /// Boxed leaf holding `key`, entered at `depth`. Its prefix covers every
    /// digit from `depth` up to the final one.
    pub(crate) fn try_leaf(
        key: u64,
        depth: usize,
        value: V,
        charge: &mut Charge,
    ) -> Result<Box<Node<V>>> {
        debug_assert!(depth <= LEAF_LEVEL);
        let prefix = (depth..LEAF_LEVEL).map(|level| key::digit(key, level)).collect();
        let slots = Slots::try_single(key::digit(key, LEAF_LEVEL), value, charge)?;
        memory::try_box(
            charge,
            Node {
                prefix,
                count: 1,
                kind: Kind::Leaf(slots),
            },
        )
    }

    /// Node owning no heap memory, used as a stand-in while a node is moved.
    pub(crate) fn placeholder() -> Self {
        Node {
            prefix: Prefix::new(),
            count: 0,
            kind: Kind::Leaf(Slots::Empty),
        }
    }

    /// Branching level of a node entered at `depth`.
    #[inline]
    pub(crate) fn level(&self, depth: usize) -> usize {
        depth + self.prefix.len()
    }

    /// Index of the first prefix digit that differs from `key`.
    #[inline]
    pub(crate) fn mismatch(&self, key: u64, depth: usize) -> Option<usize> {
        self.prefix
            .iter()
            .enumerate()
            .position(|(i, &p)| p != key::digit(key, depth + i))
    }

    /// Occupied slots, whether children or values.
    pub(crate) fn slot_count(&self) -> usize {
        match &self.kind {
            Kind::Branch(slots) => slots.len(),
            Kind::Leaf(slots) => slots.len(),
        }
    }

    pub(crate) fn repr(&self) -> Repr {
        match &self.kind {
            Kind::Branch(slots) => slots.repr(),
            Kind::Leaf(slots) => slots.repr(),
        }
    }

    /// Bytes attributed to this node alone: its box plus its slot arrays.
    pub(crate) fn footprint(&self) -> usize {
        mem::size_of::<Node<V>>()
            + match &self.kind {
                Kind::Branch(slots) => slots.heap_bytes(),
                Kind::Leaf(slots) => slots.heap_bytes(),
            }
    }

    /// Bytes attributed to this node and everything beneath it.
    pub(crate) fn total_footprint(&self) -> u64 {
        let own = self.footprint() as u64;
        match &self.kind {
            Kind::Branch(slots) => {
                own + slots
                    .iter()
                    .map(|(_, child)| child.total_footprint())
                    .sum::<u64>()
            }
            Kind::Leaf(_) => own,
        }
    }
}

//! Structural statistics gathered by walking a trie.

use std::fmt;

use crate::node::{Kind, Node, Repr};

/// Shape and memory summary of a [`TrieSet`](crate::TrieSet) or
/// [`TrieMap`](crate::TrieMap).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieStats {
    /// Keys stored.
    pub keys: u64,
    /// Nodes whose slots hold child nodes.
    pub branches: usize,
    /// Nodes whose slots hold values.
    pub leaves: usize,
    /// Nodes stored as a sorted digit list.
    pub sparse: usize,
    /// Nodes stored as a presence bitmap.
    pub bitmap: usize,
    /// Nodes stored as a direct-indexed array.
    pub full: usize,
    /// Digits held in compressed prefixes across all nodes.
    pub prefix_digits: usize,
    /// Bytes attributed to the trie.
    pub memory_used: u64,
}

impl TrieStats {
    /// Total nodes.
    pub fn nodes(&self) -> usize {
        self.branches + self.leaves
    }

    /// Average bytes per stored key, or 0 for an empty trie.
    pub fn bytes_per_key(&self) -> f64 {
        if self.keys == 0 {
            0.0
        } else {
            self.memory_used as f64 / self.keys as f64
        }
    }

    pub(crate) fn visit<V>(&mut self, node: &Node<V>) {
        self.prefix_digits += node.prefix.len();
        match node.repr() {
            Repr::Sparse => self.sparse += 1,
            Repr::Bitmap => self.bitmap += 1,
            Repr::Full => self.full += 1,
            Repr::Empty => {}
        }
        match &node.kind {
            Kind::Branch(slots) => {
                self.branches += 1;
                for (_, child) in slots.iter() {
                    self.visit(child);
                }
            }
            Kind::Leaf(_) => self.leaves += 1,
        }
    }
}

impl fmt::Display for TrieStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "keys:          {}", self.keys)?;
        writeln!(
            f,
            "nodes:         {} ({} branches, {} leaves)",
            self.nodes(),
            self.branches,
            self.leaves
        )?;
        writeln!(
            f,
            "layouts:       {} sparse, {} bitmap, {} full",
            self.sparse, self.bitmap, self.full
        )?;
        writeln!(f, "prefix digits: {}", self.prefix_digits)?;
        write!(
            f,
            "memory:        {} bytes ({:.1} bytes/key)",
            self.memory_used,
            self.bytes_per_key()
        )
    }
}

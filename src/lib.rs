//! # cardinal-trie
//!
//! Sparse, ordered sets and maps keyed by `u64`, with range counts and order
//! statistics that never scan the stored keys.
//!
//! Keys are split into 8 byte-wide digits and stored in a 256-way trie with
//! compressed prefixes. Each node picks a slot layout (sorted list, bitmap or
//! direct array) from its occupancy, and caches the number of keys beneath it, so
//! [`TrieSet::count_range`] and [`TrieSet::by_count`] cost one root-to-leaf walk.
//!
//! ## Example
//!
//! ```rust
//! use cardinal_trie::{TrieMap, TrieSet};
//!
//! let mut set = TrieSet::new();
//! for k in (2..200).step_by(2) {
//!     set.set(k).unwrap();
//! }
//! assert_eq!(set.first(21), Some(22));
//! assert_eq!(set.prev(21), Some(20));
//! assert_eq!(set.count_range(20, 29), 5);
//!
//! let mut map = TrieMap::new();
//! map.insert(3, "three").unwrap();
//! map.insert(1, "one").unwrap();
//! assert_eq!(map.by_count(2), Some((3, &"three")));
//! ```
//!
//! ## Memory
//!
//! Every trie tracks the bytes attributed to its nodes ([`TrieSet::memory_used`])
//! and can be given a ceiling through [`Config::memory_limit`]. Insertions that
//! would exceed it, or that the allocator refuses, fail with an [`Error`] and
//! leave the trie exactly as it was.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod iter;
pub mod map;
pub mod set;
pub mod shared;
pub mod stats;

mod key;
mod memory;
mod node;
mod trie;

pub use config::Config;
pub use error::{Error, Result};
pub use key::{DIGITS, FANOUT};
pub use map::TrieMap;
pub use set::TrieSet;
pub use shared::{Shared, SharedMap, SharedSet};
pub use stats::TrieStats;

#[cfg(test)]
mod proptests;

//! Error types for trie operations.
//!
//! Lookups and navigation never fail; a missing key is reported through
//! `bool` or `Option`. Only mutations that allocate can fail.

use thiserror::Error;

/// Error variants for trie operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The allocator could not provide the requested memory.
    #[error("out of memory: allocation of {requested} bytes failed")]
    OutOfMemory {
        /// Bytes the failed allocation asked for.
        requested: usize,
    },

    /// The allocation would push the trie past its configured byte limit.
    #[error("memory limit exceeded: {requested} bytes requested with {used} of {limit} bytes in use")]
    MemoryLimit {
        /// Bytes the rejected allocation asked for.
        requested: usize,
        /// Bytes attributed to the trie when the request was made.
        used: u64,
        /// The configured ceiling.
        limit: u64,
    },

    /// A [`Config`](crate::Config) violated one of its threshold rules.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl Error {
    /// Whether this error came from a failed or rejected allocation.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. } | Error::MemoryLimit { .. })
    }
}

/// A specialized Result type for trie operations.
pub type Result<T> = std::result::Result<T, Error>;

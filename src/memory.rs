//! Byte accounting and fallible allocation for trie nodes.
//!
//! Every allocation a mutation needs is admitted against the running total
//! (and the optional limit) and made through `try_*` helpers before the tree is
//! touched. After the mutation commits, the caller records the before/after
//! footprint of each node it changed, so [`MemoryAccounting::used`] always equals
//! the sum of live node footprints.

use std::alloc::{self, Layout};
use std::mem;

use tracing::warn;

use crate::error::{Error, Result};
use crate::key::FANOUT;

/// Smallest capacity a growing slot array jumps to.
const MIN_CAPACITY: usize = 2;

/// Running total of bytes attributed to one trie.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryAccounting {
    used: u64,
    limit: Option<u64>,
}

impl MemoryAccounting {
    pub(crate) fn new(limit: Option<u64>) -> Self {
        Self { used: 0, limit }
    }

    #[inline]
    pub(crate) fn used(&self) -> u64 {
        self.used
    }

    /// Start admitting allocations for one mutation.
    #[inline]
    pub(crate) fn charge(&self) -> Charge {
        Charge {
            used: self.used,
            limit: self.limit,
            pending: 0,
        }
    }

    /// Record that footprints totalling `before` bytes now total `after` bytes.
    #[inline]
    pub(crate) fn record(&mut self, before: usize, after: usize) {
        debug_assert!(self.used + after as u64 >= before as u64);
        self.used = self.used + after as u64 - before as u64;
    }

    /// Overwrite the total, for a freshly cloned tree.
    pub(crate) fn set_used(&mut self, used: u64) {
        self.used = used;
    }

    /// Zero the total, returning what it was.
    pub(crate) fn reset(&mut self) -> u64 {
        mem::take(&mut self.used)
    }
}

/// Bytes admitted so far by one in-flight mutation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Charge {
    used: u64,
    limit: Option<u64>,
    pending: usize,
}

impl Charge {
    /// Admit `bytes` more, or fail if that would pass the limit.
    pub(crate) fn admit(&mut self, bytes: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            let total = self.used + self.pending as u64 + bytes as u64;
            if total > limit {
                warn!(requested = bytes, used = self.used, limit, "memory limit exceeded");
                return Err(Error::MemoryLimit {
                    requested: bytes,
                    used: self.used,
                    limit,
                });
            }
        }
        self.pending += bytes;
        Ok(())
    }
}

fn out_of_memory(requested: usize) -> Error {
    warn!(requested, "allocation failed");
    Error::OutOfMemory { requested }
}

/// Box `value`, reporting allocator failure instead of aborting.
pub(crate) fn try_box<T>(charge: &mut Charge, value: T) -> Result<Box<T>> {
    let layout = Layout::new::<T>();
    charge.admit(layout.size())?;
    if layout.size() == 0 {
        return Ok(Box::new(value));
    }
    // SAFETY: `layout` has a non-zero size.
    let ptr = unsafe { alloc::alloc(layout) }.cast::<T>();
    if ptr.is_null() {
        return Err(out_of_memory(layout.size()));
    }
    // SAFETY: `ptr` is non-null, aligned for `T` and valid for writes. It was
    // allocated by the global allocator with `Layout::new::<T>()`, which is what
    // `Box` frees it with.
    unsafe {
        ptr.write(value);
        Ok(Box::from_raw(ptr))
    }
}

/// Empty vector with room for exactly `capacity` items.
pub(crate) fn try_vec<T>(charge: &mut Charge, capacity: usize) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    if mem::size_of::<T>() != 0 {
        charge.admit(capacity * mem::size_of::<T>())?;
    }
    vec.try_reserve_exact(capacity)
        .map_err(|_| out_of_memory(capacity * mem::size_of::<T>()))?;
    Ok(vec)
}

/// Make room for `additional` more items, growing geometrically up to the fan-out.
pub(crate) fn try_grow<T>(charge: &mut Charge, vec: &mut Vec<T>, additional: usize) -> Result<()> {
    let needed = vec.len() + additional;
    if needed <= vec.capacity() {
        return Ok(());
    }
    let target = (vec.capacity() * 2).clamp(MIN_CAPACITY, FANOUT).max(needed);
    let bytes = (target - vec.capacity()) * mem::size_of::<T>();
    charge.admit(bytes)?;
    vec.try_reserve_exact(target - vec.len())
        .map_err(|_| out_of_memory(bytes))
}

/// One empty slot per digit.
pub(crate) fn try_full<T>(charge: &mut Charge) -> Result<Box<[Option<T>]>> {
    let mut slots = try_vec(charge, FANOUT)?;
    slots.resize_with(FANOUT, || None);
    Ok(slots.into_boxed_slice())
}

/// Give back spare capacity once a slot array has shrunk well below it.
pub(crate) fn trim<T>(vec: &mut Vec<T>) {
    if mem::size_of::<T>() != 0 && vec.capacity() > 2 * vec.len() + MIN_CAPACITY {
        vec.shrink_to(vec.len() + vec.len() / 2);
    }
}

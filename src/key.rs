//! Digit decomposition of 64-bit keys.
//!
//! A key is read as 8 byte-wide digits, most significant first. Level 0 is the
//! top byte, level 7 the bottom byte where values live.

use std::ops::{Bound, RangeBounds};

/// Number of digits in a key.
pub const DIGITS: usize = 8;

/// Possible values of one digit.
pub const FANOUT: usize = 256;

/// Level of the final digit.
pub(crate) const LEAF_LEVEL: usize = DIGITS - 1;

/// Digit of `key` at `level`.
#[inline]
pub(crate) fn digit(key: u64, level: usize) -> u8 {
    debug_assert!(level < DIGITS);
    (key >> (8 * (LEAF_LEVEL - level))) as u8
}

/// `path` with `digit` placed at `level`. Levels must be written at most once.
#[inline]
pub(crate) fn with_digit(path: u64, level: usize, digit: u8) -> u64 {
    debug_assert!(level < DIGITS);
    path | (u64::from(digit) << (8 * (LEAF_LEVEL - level)))
}

/// Inclusive `(low, high)` bounds of a range, or `None` when the range is empty.
pub(crate) fn inclusive_bounds(range: impl RangeBounds<u64>) -> Option<(u64, u64)> {
    let low = match range.start_bound() {
        Bound::Included(&low) => low,
        Bound::Excluded(&low) => low.checked_add(1)?,
        Bound::Unbounded => 0,
    };
    let high = match range.end_bound() {
        Bound::Included(&high) => high,
        Bound::Excluded(&high) => high.checked_sub(1)?,
        Bound::Unbounded => u64::MAX,
    };
    (low <= high).then_some((low, high))
}

//! Slot layouts for one trie level.
//!
//! A level has 256 possible digits. How the occupied ones are stored depends on
//! how many there are:
//!
//! - Sparse: sorted digit list plus a parallel item list
//! - Bitmap: 256 presence bits plus items packed in digit order
//! - Full: one slot per digit, indexed directly
//!
//! Promotion and demotion use separate thresholds from [`Config`], so alternating
//! insert/remove at a boundary does not flip the layout back and forth.

use std::iter::FusedIterator;
use std::mem;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Result;
use crate::key::FANOUT;
use crate::memory::{self, Charge};

/// Storage layout of a node's slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repr {
    /// No occupied digits.
    Empty,
    /// Sorted digit list.
    Sparse,
    /// Presence bitmap with packed items.
    Bitmap,
    /// Direct-indexed array.
    Full,
}

#[derive(Clone)]
pub(crate) enum Slots<T> {
    Empty,
    Sparse { digits: Vec<u8>, items: Vec<T> },
    Bitmap { bits: [u64; 4], items: Vec<T> },
    Full { items: Box<[Option<T>]>, len: u16 },
}

// =============================================================================
// Bitmap helpers
// =============================================================================

#[inline]
fn has_bit(bits: &[u64; 4], digit: u8) -> bool {
    bits[usize::from(digit >> 6)] & (1u64 << (digit & 63)) != 0
}

#[inline]
fn set_bit(bits: &mut [u64; 4], digit: u8) {
    bits[usize::from(digit >> 6)] |= 1u64 << (digit & 63);
}

#[inline]
fn clear_bit(bits: &mut [u64; 4], digit: u8) {
    bits[usize::from(digit >> 6)] &= !(1u64 << (digit & 63));
}

/// Number of set digits strictly below `digit`.
#[inline]
fn rank_below(bits: &[u64; 4], digit: u8) -> usize {
    let word = usize::from(digit >> 6);
    let below: u32 = bits[..word].iter().map(|w| w.count_ones()).sum();
    let mask = (1u64 << (digit & 63)) - 1;
    (below + (bits[word] & mask).count_ones()) as usize
}

/// Smallest set digit `>= digit`.
fn next_set(bits: &[u64; 4], digit: u8) -> Option<u8> {
    let mut word = usize::from(digit >> 6);
    let mut w = bits[word] & (!0u64 << (digit & 63));
    loop {
        if w != 0 {
            return Some((word * 64 + w.trailing_zeros() as usize) as u8);
        }
        word += 1;
        if word == bits.len() {
            return None;
        }
        w = bits[word];
    }
}

/// Largest set digit `<= digit`.
fn prev_set(bits: &[u64; 4], digit: u8) -> Option<u8> {
    let mut word = usize::from(digit >> 6);
    let mut w = bits[word] & (!0u64 >> (63 - (digit & 63)));
    loop {
        if w != 0 {
            return Some((word * 64 + 63 - w.leading_zeros() as usize) as u8);
        }
        if word == 0 {
            return None;
        }
        word -= 1;
        w = bits[word];
    }
}

/// The `n`th set digit, counting from 0.
fn select_bit(bits: &[u64; 4], mut n: usize) -> Option<u8> {
    for (word, &w) in bits.iter().enumerate() {
        let ones = w.count_ones() as usize;
        if n < ones {
            let mut w = w;
            for _ in 0..n {
                w &= w - 1;
            }
            return Some((word * 64 + w.trailing_zeros() as usize) as u8);
        }
        n -= ones;
    }
    None
}

/// Set digits in ascending order.
fn bit_digits(bits: &[u64; 4]) -> impl Iterator<Item = u8> + '_ {
    bits.iter().enumerate().flat_map(|(word, &w)| {
        let mut w = w;
        std::iter::from_fn(move || {
            if w == 0 {
                return None;
            }
            let bit = w.trailing_zeros() as usize;
            w &= w - 1;
            Some((word * 64 + bit) as u8)
        })
    })
}

// =============================================================================
// Slots
// =============================================================================

impl<T> Slots<T> {
    /// Sparse layout holding one item.
    pub(crate) fn try_single(digit: u8, item: T, charge: &mut Charge) -> Result<Self> {
        let mut digits = memory::try_vec(charge, 1)?;
        let mut items = memory::try_vec(charge, 1)?;
        digits.push(digit);
        items.push(item);
        Ok(Slots::Sparse { digits, items })
    }

    /// Sparse layout with room for `capacity` items and none filled yet.
    pub(crate) fn try_reserved(capacity: usize, charge: &mut Charge) -> Result<Self> {
        Ok(Slots::Sparse {
            digits: memory::try_vec(charge, capacity)?,
            items: memory::try_vec(charge, capacity)?,
        })
    }

    /// Append to a layout built by [`Slots::try_reserved`]. Digits must arrive in
    /// ascending order and fit the reserved capacity.
    pub(crate) fn push_reserved(&mut self, digit: u8, item: T) {
        if let Slots::Sparse { digits, items } = self {
            debug_assert!(digits.len() < digits.capacity());
            debug_assert!(digits.last().map_or(true, |&last| last < digit));
            digits.push(digit);
            items.push(item);
        } else {
            debug_assert!(false, "push_reserved on a non-sparse layout");
        }
    }

    pub(crate) fn repr(&self) -> Repr {
        match self {
            Slots::Empty => Repr::Empty,
            Slots::Sparse { .. } => Repr::Sparse,
            Slots::Bitmap { .. } => Repr::Bitmap,
            Slots::Full { .. } => Repr::Full,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Slots::Empty => 0,
            Slots::Sparse { digits, .. } => digits.len(),
            Slots::Bitmap { items, .. } => items.len(),
            Slots::Full { len, .. } => usize::from(*len),
        }
    }

    /// Heap bytes owned by this layout.
    pub(crate) fn heap_bytes(&self) -> usize {
        match self {
            Slots::Empty => 0,
            Slots::Sparse { digits, items } => {
                digits.capacity() + items.capacity() * mem::size_of::<T>()
            }
            Slots::Bitmap { items, .. } => items.capacity() * mem::size_of::<T>(),
            Slots::Full { items, .. } => items.len() * mem::size_of::<Option<T>>(),
        }
    }

    pub(crate) fn get(&self, digit: u8) -> Option<&T> {
        match self {
            Slots::Empty => None,
            Slots::Sparse { digits, items } => {
                let pos = digits.iter().position(|&d| d == digit)?;
                Some(&items[pos])
            }
            Slots::Bitmap { bits, items } => {
                has_bit(bits, digit).then(|| &items[rank_below(bits, digit)])
            }
            Slots::Full { items, .. } => items[usize::from(digit)].as_ref(),
        }
    }

    pub(crate) fn get_mut(&mut self, digit: u8) -> Option<&mut T> {
        match self {
            Slots::Empty => None,
            Slots::Sparse { digits, items } => {
                let pos = digits.iter().position(|&d| d == digit)?;
                Some(&mut items[pos])
            }
            Slots::Bitmap { bits, items } => {
                if has_bit(bits, digit) {
                    Some(&mut items[rank_below(bits, digit)])
                } else {
                    None
                }
            }
            Slots::Full { items, .. } => items[usize::from(digit)].as_mut(),
        }
    }

    /// Occupied digit with the smallest value `>= digit`.
    pub(crate) fn first_from(&self, digit: u8) -> Option<(u8, &T)> {
        match self {
            Slots::Empty => None,
            Slots::Sparse { digits, items } => {
                let pos = digits.partition_point(|&d| d < digit);
                digits.get(pos).map(|&d| (d, &items[pos]))
            }
            Slots::Bitmap { bits, items } => {
                let d = next_set(bits, digit)?;
                Some((d, &items[rank_below(bits, d)]))
            }
            Slots::Full { items, .. } => items[usize::from(digit)..]
                .iter()
                .enumerate()
                .find_map(|(i, slot)| {
                    slot.as_ref()
                        .map(|item| ((usize::from(digit) + i) as u8, item))
                }),
        }
    }

    /// Occupied digit with the largest value `<= digit`.
    pub(crate) fn last_until(&self, digit: u8) -> Option<(u8, &T)> {
        match self {
            Slots::Empty => None,
            Slots::Sparse { digits, items } => {
                let pos = digits.partition_point(|&d| d <= digit);
                let pos = pos.checked_sub(1)?;
                Some((digits[pos], &items[pos]))
            }
            Slots::Bitmap { bits, items } => {
                let d = prev_set(bits, digit)?;
                Some((d, &items[rank_below(bits, d)]))
            }
            Slots::Full { items, .. } => items[..=usize::from(digit)]
                .iter()
                .enumerate()
                .rev()
                .find_map(|(i, slot)| slot.as_ref().map(|item| (i as u8, item))),
        }
    }

    /// The `n`th occupied digit in ascending order, counting from 0.
    pub(crate) fn nth(&self, n: usize) -> Option<(u8, &T)> {
        match self {
            Slots::Empty => None,
            Slots::Sparse { digits, items } => digits.get(n).map(|&d| (d, &items[n])),
            Slots::Bitmap { bits, items } => {
                let d = select_bit(bits, n)?;
                Some((d, &items[n]))
            }
            Slots::Full { .. } => self.iter().nth(n),
        }
    }

    /// Number of occupied digits strictly below `digit`.
    pub(crate) fn count_below(&self, digit: u8) -> usize {
        match self {
            Slots::Empty => 0,
            Slots::Sparse { digits, .. } => digits.partition_point(|&d| d < digit),
            Slots::Bitmap { bits, .. } => rank_below(bits, digit),
            Slots::Full { items, .. } => items[..usize::from(digit)]
                .iter()
                .filter(|slot| slot.is_some())
                .count(),
        }
    }

    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self,
            next_digit: 0,
            index: 0,
        }
    }

    /// Insert under a digit that is not yet occupied, promoting the layout when
    /// occupancy crosses its upper threshold.
    ///
    /// Allocation happens before the layout changes: on error the slots hold the
    /// same items as before and `item` is dropped.
    pub(crate) fn try_insert(
        &mut self,
        digit: u8,
        item: T,
        config: &Config,
        charge: &mut Charge,
    ) -> Result<()> {
        debug_assert!(self.get(digit).is_none());
        let len = self.len();
        match self {
            Slots::Empty => {
                *self = Slots::try_single(digit, item, charge)?;
            }
            Slots::Sparse { digits, items } if len < config.sparse_max => {
                memory::try_grow(charge, digits, 1)?;
                memory::try_grow(charge, items, 1)?;
                let pos = digits.partition_point(|&d| d < digit);
                digits.insert(pos, digit);
                items.insert(pos, item);
            }
            Slots::Sparse { digits, items } => {
                let mut packed = memory::try_vec(charge, len + 1)?;
                let mut bits = [0u64; 4];
                for &d in digits.iter() {
                    set_bit(&mut bits, d);
                }
                set_bit(&mut bits, digit);
                packed.append(items);
                packed.insert(rank_below(&bits, digit), item);
                trace!(len = len + 1, "promoted sparse slots to bitmap");
                *self = Slots::Bitmap {
                    bits,
                    items: packed,
                };
            }
            Slots::Bitmap { bits, items } if len < config.bitmap_max => {
                memory::try_grow(charge, items, 1)?;
                items.insert(rank_below(bits, digit), item);
                set_bit(bits, digit);
            }
            Slots::Bitmap { bits, items } => {
                let mut full = memory::try_full(charge)?;
                for (d, it) in bit_digits(bits).zip(items.drain(..)) {
                    full[usize::from(d)] = Some(it);
                }
                full[usize::from(digit)] = Some(item);
                trace!(len = len + 1, "promoted bitmap slots to full");
                *self = Slots::Full {
                    items: full,
                    len: (len + 1) as u16,
                };
            }
            Slots::Full { items, len } => {
                items[usize::from(digit)] = Some(item);
                *len += 1;
            }
        }
        Ok(())
    }

    /// Remove the item under `digit`, demoting the layout when occupancy falls to
    /// its lower threshold.
    ///
    /// A demotion that needs memory `charge` does not admit is skipped; the
    /// larger layout stays valid.
    pub(crate) fn remove(&mut self, digit: u8, config: &Config, charge: &mut Charge) -> Option<T> {
        let item = match self {
            Slots::Empty => return None,
            Slots::Sparse { digits, items } => {
                let pos = digits.iter().position(|&d| d == digit)?;
                digits.remove(pos);
                items.remove(pos)
            }
            Slots::Bitmap { bits, items } => {
                if !has_bit(bits, digit) {
                    return None;
                }
                let item = items.remove(rank_below(bits, digit));
                clear_bit(bits, digit);
                item
            }
            Slots::Full { items, len } => {
                let item = items[usize::from(digit)].take()?;
                *len -= 1;
                item
            }
        };
        self.settle(config, charge);
        Some(item)
    }

    /// Pick the layout for the current occupancy after a removal.
    fn settle(&mut self, config: &Config, charge: &mut Charge) {
        let len = self.len();
        if len == 0 {
            *self = Slots::Empty;
            return;
        }
        match self {
            Slots::Sparse { digits, items } => {
                memory::trim(digits);
                memory::trim(items);
            }
            Slots::Bitmap { bits, items } if len <= config.sparse_demote => {
                let mut digits = Vec::new();
                if charge.admit(len).is_err() || digits.try_reserve_exact(len).is_err() {
                    debug!(len, "kept bitmap slots, no memory to demote");
                    return;
                }
                digits.extend(bit_digits(bits));
                let mut items = mem::take(items);
                memory::trim(&mut items);
                trace!(len, "demoted bitmap slots to sparse");
                *self = Slots::Sparse { digits, items };
            }
            Slots::Bitmap { items, .. } => memory::trim(items),
            Slots::Full { items, .. } if len <= config.bitmap_demote => {
                // Packing frees the full array, so only the allocator can refuse it.
                let mut packed = Vec::new();
                if packed.try_reserve_exact(len).is_err() {
                    debug!(len, "kept full slots, no memory to demote");
                    return;
                }
                let mut bits = [0u64; 4];
                for (d, slot) in items.iter_mut().enumerate() {
                    if let Some(item) = slot.take() {
                        set_bit(&mut bits, d as u8);
                        packed.push(item);
                    }
                }
                trace!(len, "demoted full slots to bitmap");
                *self = Slots::Bitmap {
                    bits,
                    items: packed,
                };
            }
            Slots::Full { .. } | Slots::Empty => {}
        }
    }
}

/// Occupied slots in ascending digit order.
pub(crate) struct Iter<'a, T> {
    slots: &'a Slots<T>,
    next_digit: usize,
    index: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (u8, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        match self.slots {
            Slots::Empty => None,
            Slots::Sparse { digits, items } => {
                let digit = *digits.get(self.index)?;
                let item = &items[self.index];
                self.index += 1;
                Some((digit, item))
            }
            Slots::Bitmap { bits, items } => {
                let item = items.get(self.index)?;
                let digit = next_set(bits, self.next_digit as u8)?;
                self.index += 1;
                self.next_digit = usize::from(digit) + 1;
                Some((digit, item))
            }
            Slots::Full { items, .. } => {
                while self.next_digit < FANOUT {
                    let digit = self.next_digit;
                    self.next_digit += 1;
                    if let Some(item) = &items[digit] {
                        return Some((digit as u8, item));
                    }
                }
                None
            }
        }
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

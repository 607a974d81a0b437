//! Field masks.
//!
//! A [`FieldMask`] selects a subset of a model's fields by canonical position:
//! bit *i* is the *i*-th entry of `Model::FIELDS`. Masks carry no reference to
//! the model they were built for; bits beyond the field list are rejected when
//! a statement is built for the mask.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// A set of canonical field positions.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldMask(u64);

impl FieldMask {
    /// Selects nothing.
    pub const EMPTY: FieldMask = FieldMask(0);

    /// Largest number of fields a mask can address.
    pub const CAPACITY: usize = 64;

    /// Wrap a raw bit pattern.
    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Mask selecting the single field at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= 64`; in const contexts this is a compile error.
    #[must_use]
    pub const fn bit(index: usize) -> Self {
        assert!(index < Self::CAPACITY, "field index beyond mask capacity");
        Self(1u64 << index)
    }

    /// Mask selecting the first `n` fields.
    #[must_use]
    pub const fn first(n: usize) -> Self {
        if n >= Self::CAPACITY {
            Self(u64::MAX)
        } else {
            Self((1u64 << n) - 1)
        }
    }

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Number of selected fields.
    #[must_use]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// True when no field is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when the field at `index` is selected.
    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1u64 << index) != 0
    }

    /// Union of two masks.
    #[must_use]
    pub const fn union(self, other: FieldMask) -> Self {
        Self(self.0 | other.0)
    }

    /// Highest selected position, if any.
    #[must_use]
    pub const fn highest(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(63 - self.0.leading_zeros())
        }
    }

    /// Lowest selected position that is `>= limit`, if any.
    #[must_use]
    pub const fn first_beyond(self, limit: usize) -> Option<u32> {
        if limit >= Self::CAPACITY {
            return None;
        }
        let over = self.0 & !((1u64 << limit) - 1);
        if over == 0 {
            None
        } else {
            Some(over.trailing_zeros())
        }
    }

    /// Selected positions in ascending order.
    pub fn iter(self) -> Iter {
        Iter(self.0)
    }
}

/// Number of fields selected by `mask`; sizes argument and destination slices.
#[must_use]
pub const fn field_count(mask: FieldMask) -> usize {
    mask.count()
}

/// Ascending iterator over the positions in a [`FieldMask`].
#[derive(Debug, Clone)]
pub struct Iter(u64);

impl Iterator for Iter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Iter {}

impl IntoIterator for FieldMask {
    type Item = usize;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

impl From<u64> for FieldMask {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl BitOr for FieldMask {
    type Output = FieldMask;

    fn bitor(self, rhs: FieldMask) -> FieldMask {
        FieldMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for FieldMask {
    fn bitor_assign(&mut self, rhs: FieldMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FieldMask {
    type Output = FieldMask;

    fn bitand(self, rhs: FieldMask) -> FieldMask {
        FieldMask(self.0 & rhs.0)
    }
}

impl Not for FieldMask {
    type Output = FieldMask;

    fn not(self) -> FieldMask {
        FieldMask(!self.0)
    }
}

impl fmt::Debug for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldMask({:#b})", self.0)
    }
}

impl fmt::Binary for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

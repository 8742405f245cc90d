//! Track which fields of a builder were explicitly assigned.
//!
//! "Assigned" is not the same as "has a value": a builder field that was never
//! touched keeps no value at all, and only at build time is it filled from the
//! field's type default (fresh builds) or from the origin record (derived builds).

/// A compact bitset representing "field was assigned" for ordinals `0..len`.
///
/// The backing storage is sized from the field count when the set is created,
/// so there is no fixed ceiling on the number of fields a record may declare.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldsSet {
    len: usize,
    bits: Box<[u64]>,
}

impl FieldsSet {
    /// Create an empty (nothing assigned) set for `len` fields.
    #[must_use]
    pub fn empty(len: usize) -> Self {
        let words = len.div_ceil(64);
        Self {
            len,
            bits: vec![0u64; words].into_boxed_slice(),
        }
    }

    /// Create a full (everything assigned) set for `len` fields.
    #[must_use]
    pub fn all(len: usize) -> Self {
        let mut s = Self::empty(len);
        for idx in 0..len {
            s.set(idx);
        }
        s
    }

    /// Number of fields represented by this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the set tracks zero fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark a field ordinal as assigned.
    ///
    /// Returns `false` and leaves the set untouched when `idx` is outside
    /// `0..len`; an out-of-range ordinal never wraps onto another field's bit.
    pub fn set(&mut self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        let word = idx / 64;
        let bit = idx % 64;
        match self.bits.get_mut(word) {
            Some(w) => {
                *w |= 1u64 << bit;
                true
            }
            None => false,
        }
    }

    /// Check whether a field ordinal is assigned.
    #[must_use]
    pub fn is_set(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        let word = idx / 64;
        let bit = idx % 64;
        self.bits
            .get(word)
            .is_some_and(|w| (w & (1u64 << bit)) != 0)
    }

    /// Number of assigned ordinals.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if no ordinal is assigned.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Iterate over assigned ordinals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|idx| self.is_set(*idx))
    }
}

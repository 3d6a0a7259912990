//! A fixed cyclic sequence of values with a movable cursor.
//!
//! `RingSequence` is the building block of every clock unit. Values live in a
//! contiguous `Vec` in insertion order and the cursor is an index into it, so
//! moving forward or back is modular arithmetic. A value-to-positions table
//! makes `seek` a lookup instead of a walk around the ring.
//!
//! ```text
//!        advance ──►
//!   ┌──► 0 ─ 1 ─ 2 ─ ... ─ n-1 ──┐
//!   └────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::hash::Hash;

/// A circular sequence of values with a cursor on "the current value".
///
/// Once at least one value has been added the cursor always points at a
/// valid element, and `advance` applied `len()` times returns it to where
/// it started.
#[derive(Debug, Clone)]
pub struct RingSequence<T> {
    slots: Vec<T>,
    positions: HashMap<T, Vec<usize>>,
    cursor: usize,
}

impl<T> Default for RingSequence<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            positions: HashMap::new(),
            cursor: 0,
        }
    }
}

impl<T: Clone + Eq + Hash> RingSequence<T> {
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the end of the cycle.
    ///
    /// The first value added becomes the current one; later additions do not
    /// move the cursor.
    pub fn add(&mut self, value: T) {
        let index = self.slots.len();
        self.positions.entry(value.clone()).or_default().push(index);
        self.slots.push(value);
    }

    /// Moves the cursor to the next element. No-op on an empty ring.
    pub fn advance(&mut self) {
        if !self.slots.is_empty() {
            self.cursor = (self.cursor + 1) % self.slots.len();
        }
    }

    /// Moves the cursor to the previous element. No-op on an empty ring.
    pub fn retreat(&mut self) {
        if !self.slots.is_empty() {
            self.cursor = (self.cursor + self.slots.len() - 1) % self.slots.len();
        }
    }

    /// Returns the value under the cursor, or `None` if the ring is empty.
    pub fn current(&self) -> Option<&T> {
        self.slots.get(self.cursor)
    }

    /// Moves the cursor to the first element equal to `value`, scanning
    /// forward from the current position.
    ///
    /// Returns `false` and leaves the cursor where it was if no element
    /// matches.
    pub fn seek(&mut self, value: &T) -> bool {
        let len = self.slots.len();
        let cursor = self.cursor;
        let nearest = self.positions.get(value).and_then(|positions| {
            positions
                .iter()
                .copied()
                .min_by_key(|&position| (position + len - cursor) % len)
        });
        match nearest {
            Some(position) => {
                self.cursor = position;
                true
            }
            None => false,
        }
    }

    /// Iterates over every element once, in cyclic order, starting at the cursor.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        let len = self.slots.len();
        (0..len).map(move |offset| &self.slots[(self.cursor + offset) % len])
    }

    /// Returns the cursor's offset from the first element added.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T: Clone + Eq + Hash> FromIterator<T> for RingSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut ring = Self::new();
        for value in iter {
            ring.add(value);
        }
        ring
    }
}

//! Position table and position sets
//!
//! Every leaf occurrence of a symbol in a content model is a position.
//! Positions are numbered left to right as the model is assembled; all
//! automaton state is expressed as sets of them.

use std::fmt;

use super::particles::ParticleRef;
use super::symbols::Symbol;

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-size bit vector over the positions of one content model
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PositionSet {
    words: Vec<u64>,
    capacity: usize,
}

impl PositionSet {
    /// Empty set able to hold positions `0..capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Number of positions this set ranges over
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a position
    pub fn insert(&mut self, position: usize) {
        debug_assert!(position < self.capacity, "position {} out of range", position);
        self.words[position / WORD_BITS] |= 1u64 << (position % WORD_BITS);
    }

    /// Remove a position
    pub fn remove(&mut self, position: usize) {
        if position < self.capacity {
            self.words[position / WORD_BITS] &= !(1u64 << (position % WORD_BITS));
        }
    }

    /// Check membership
    pub fn contains(&self, position: usize) -> bool {
        position < self.capacity
            && self.words[position / WORD_BITS] & (1u64 << (position % WORD_BITS)) != 0
    }

    /// Remove every position
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// In-place union
    pub fn union_with(&mut self, other: &PositionSet) {
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= *src;
        }
    }

    /// In-place intersection
    pub fn intersect_with(&mut self, other: &PositionSet) {
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst &= *src;
        }
    }

    /// Check whether the two sets share a position
    pub fn intersects(&self, other: &PositionSet) -> bool {
        self.words.iter().zip(&other.words).any(|(a, b)| a & b != 0)
    }

    /// Check whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of positions in the set
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Smallest member at or after `from`
    pub fn next_from(&self, from: usize) -> Option<usize> {
        if from >= self.capacity {
            return None;
        }
        let mut word_index = from / WORD_BITS;
        let mut word = self.words[word_index] & (!0u64 << (from % WORD_BITS));
        loop {
            if word != 0 {
                let position = word_index * WORD_BITS + word.trailing_zeros() as usize;
                return (position < self.capacity).then_some(position);
            }
            word_index += 1;
            word = *self.words.get(word_index)?;
        }
    }

    /// Members in ascending order
    pub fn iter(&self) -> Iter<'_> {
        Iter { set: self, next: 0 }
    }
}

impl fmt::Debug for PositionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending iterator over a [`PositionSet`]
pub struct Iter<'a> {
    set: &'a PositionSet,
    next: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let position = self.set.next_from(self.next)?;
        self.next = position + 1;
        Some(position)
    }
}

impl<'a> IntoIterator for &'a PositionSet {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// One leaf occurrence
#[derive(Debug, Clone)]
pub struct Position {
    /// Symbol matched at this leaf
    pub symbol: Symbol,
    /// Particle the leaf was declared by; `None` for the end marker
    pub particle: Option<ParticleRef>,
}

/// Append-only table of positions
#[derive(Debug, Clone, Default)]
pub struct Positions {
    entries: Vec<Position>,
}

impl Positions {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position and return its index
    pub fn add(&mut self, symbol: Symbol, particle: Option<ParticleRef>) -> usize {
        self.entries.push(Position { symbol, particle });
        self.entries.len() - 1
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position at `index`
    pub fn get(&self, index: usize) -> &Position {
        &self.entries[index]
    }

    /// Symbol at `index`
    pub fn symbol(&self, index: usize) -> Symbol {
        self.entries[index].symbol
    }

    /// Particle at `index`
    pub fn particle(&self, index: usize) -> Option<&ParticleRef> {
        self.entries[index].particle.as_ref()
    }

    /// Iterate over all positions
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.entries.iter()
    }
}

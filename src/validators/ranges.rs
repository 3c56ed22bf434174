//! Range-counting support
//!
//! A bounded occurrence `body{min,max}` is compiled as `body` followed by a
//! range terminal position. The terminal never matches input; reaching it
//! means one iteration of the body has completed. From there the matcher
//! may start another iteration (while the count stays under `max`) or leave
//! the range (once the count reaches `min`), so every open element carries
//! one counter per range. Because an element may be the last of one
//! iteration or the first of the next, several counter configurations can
//! be live at once; the matcher advances all of them.
//!
//! The same terminal walk without counters gives the static "applicable
//! follow sets" used by the ambiguity checker.

use log::trace;
use std::collections::HashSet;

use super::positions::{PositionSet, Positions};
use super::syntax::RangeLeaf;

/// Compiled range information of one content model
#[derive(Debug, Clone)]
pub struct RangeTable {
    ranges: Vec<RangeLeaf>,
    /// Range index for every terminal position
    range_of: Vec<Option<usize>>,
    /// Real positions reachable from each terminal through repetition and
    /// exits, ignoring counters; indexed by range
    total_follow: Vec<PositionSet>,
}

impl RangeTable {
    /// Build the table for the ranges of a computed tree
    pub fn new(ranges: Vec<RangeLeaf>, followpos: &[PositionSet], positions: &Positions) -> Self {
        let mut range_of = vec![None; positions.len()];
        for (index, range) in ranges.iter().enumerate() {
            range_of[range.terminal] = Some(index);
        }

        let mut table = Self {
            ranges,
            range_of,
            total_follow: Vec::new(),
        };
        let total_follow: Vec<PositionSet> = (0..table.ranges.len())
            .map(|index| table.close_over_terminals(index, followpos))
            .collect();
        table.total_follow = total_follow;
        table
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the model has no range
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Range information by index
    pub fn range(&self, index: usize) -> &RangeLeaf {
        &self.ranges[index]
    }

    /// Range closed by the terminal at `position`, if it is one
    pub fn range_at(&self, position: usize) -> Option<usize> {
        self.range_of.get(position).copied().flatten()
    }

    fn close_over_terminals(&self, start: usize, followpos: &[PositionSet]) -> PositionSet {
        let capacity = self.range_of.len();
        let mut result = PositionSet::new(capacity);
        let mut seen = vec![false; self.ranges.len()];
        let mut stack = vec![start];
        seen[start] = true;

        while let Some(index) = stack.pop() {
            let range = &self.ranges[index];
            let mut reachable = followpos[range.terminal].clone();
            if range.is_ambiguous() {
                reachable.union_with(&range.body_first);
            }
            for p in &reachable {
                match self.range_at(p) {
                    Some(inner) if !seen[inner] => {
                        seen[inner] = true;
                        stack.push(inner);
                    }
                    Some(_) => {}
                    None => result.insert(p),
                }
            }
        }
        result
    }

    /// Real positions of `set` plus everything its terminals lead to.
    pub fn expand(&self, set: &PositionSet) -> PositionSet {
        let mut expanded = set.clone();
        for p in set {
            if let Some(index) = self.range_at(p) {
                expanded.remove(p);
                expanded.union_with(&self.total_follow[index]);
            }
        }
        expanded
    }

    /// Visit every real position reachable from `frontier` through range
    /// terminals, together with the counters in force once it is reached.
    ///
    /// At a terminal both continuations are followed: another iteration of
    /// the body while the count is under the maximum, and leaving the range
    /// once it has reached the minimum. A terminal is crossed at most once
    /// per walk with the same counters, which ends cycles through ranges
    /// whose bodies can match nothing.
    pub fn walk<F>(
        &self,
        frontier: &PositionSet,
        followpos: &[PositionSet],
        counters: &[u32],
        visit: &mut F,
    ) where
        F: FnMut(usize, &[u32]),
    {
        let mut counters = counters.to_vec();
        let mut crossed = HashSet::new();
        self.walk_from(frontier, followpos, &mut counters, &mut crossed, visit);
    }

    fn walk_from<F>(
        &self,
        frontier: &PositionSet,
        followpos: &[PositionSet],
        counters: &mut [u32],
        crossed: &mut HashSet<(usize, Vec<u32>)>,
        visit: &mut F,
    ) where
        F: FnMut(usize, &[u32]),
    {
        for p in frontier {
            let Some(index) = self.range_at(p) else {
                visit(p, counters);
                continue;
            };
            if !crossed.insert((index, counters.to_vec())) {
                continue;
            }
            let range = &self.ranges[index];
            let bounds = range.occurs();
            let saved = counters[index];
            if bounds.is_exhausted(saved) {
                continue;
            }
            let count = saved.saturating_add(1);

            if !bounds.is_exhausted(count) {
                // past the minimum an unbounded range only needs to know it got there
                counters[index] = if bounds.is_unbounded() {
                    count.min(bounds.min)
                } else {
                    count
                };
                trace!("range terminal {} repeats, iteration {}", p, count);
                self.walk_from(&range.body_first, followpos, counters, crossed, visit);
            }
            if count >= bounds.min {
                counters[index] = 0;
                trace!("range terminal {} exits after {} iterations", p, count);
                self.walk_from(&followpos[p], followpos, counters, crossed, visit);
            }
            counters[index] = saved;
        }
    }
}

/// One live matching thread of a range-counting model: the positions that
/// may match next and the iteration counters that go with them
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Configuration {
    /// Positions the next child may match, terminals included
    pub frontier: PositionSet,
    /// Completed iterations of every range currently entered
    pub counters: Vec<u32>,
}

impl Configuration {
    /// Configuration before the first child
    pub fn initial(firstpos: &PositionSet, ranges: usize) -> Self {
        Self {
            frontier: firstpos.clone(),
            counters: vec![0; ranges],
        }
    }
}

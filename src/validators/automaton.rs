//! Deterministic transition tables
//!
//! Subset construction over `followpos`: every state is the set of positions
//! the model may be at, and consuming a symbol moves to the union of the
//! follow sets of the positions carrying it. The number of states is capped;
//! running over the cap leaves the model in its position-set form.

use indexmap::IndexSet;
use log::debug;

use super::positions::{PositionSet, Positions};
use super::symbols::Symbol;

/// One edge of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Target state
    pub target: usize,
    /// Lowest position of the source state that carries the symbol; used to
    /// attribute the match to a particle
    pub position: usize,
}

/// Deterministic automaton over the symbols of one content model
#[derive(Debug, Clone)]
pub struct TransitionTable {
    /// Position set of every state, state 0 is the start state
    states: Vec<PositionSet>,
    /// Row-major, `symbol_count` entries per state
    transitions: Vec<Option<Transition>>,
    accepting: Vec<bool>,
    symbol_count: usize,
}

impl TransitionTable {
    /// Start state
    pub const START: usize = 0;

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always false, a table has at least its start state
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Transition from `state` on `symbol`
    pub fn next(&self, state: usize, symbol: Symbol) -> Option<Transition> {
        let index = symbol.index()?;
        if index >= self.symbol_count {
            return None;
        }
        self.transitions
            .get(state * self.symbol_count + index)
            .copied()
            .flatten()
    }

    /// Check whether the content may end in `state`
    pub fn is_accepting(&self, state: usize) -> bool {
        self.accepting.get(state).copied().unwrap_or(false)
    }

    /// Positions represented by `state`
    pub fn positions_of(&self, state: usize) -> &PositionSet {
        &self.states[state]
    }
}

/// Determinize a computed model.
///
/// Returns `None` when more than `max_states` states would be needed.
pub fn build_transition_table(
    firstpos: &PositionSet,
    followpos: &[PositionSet],
    positions: &Positions,
    symbol_count: usize,
    end: usize,
    max_states: usize,
) -> Option<TransitionTable> {
    let capacity = positions.len();
    let mut states: IndexSet<PositionSet> = IndexSet::new();
    states.insert(firstpos.clone());
    let mut transitions = Vec::new();

    let mut current = 0;
    while current < states.len() {
        let source = states.get_index(current)?.clone();
        let mut targets: Vec<Option<PositionSet>> = vec![None; symbol_count];
        let mut attributed: Vec<Option<usize>> = vec![None; symbol_count];

        for p in &source {
            let Some(index) = positions.symbol(p).index() else {
                continue;
            };
            targets[index]
                .get_or_insert_with(|| PositionSet::new(capacity))
                .union_with(&followpos[p]);
            attributed[index].get_or_insert(p);
        }

        for (target, position) in targets.into_iter().zip(attributed) {
            let edge = match (target, position) {
                (Some(target), Some(position)) => {
                    let (index, inserted) = states.insert_full(target);
                    if inserted && states.len() > max_states {
                        debug!(
                            "transition table exceeds {} states over {} positions",
                            max_states, capacity
                        );
                        return None;
                    }
                    Some(Transition {
                        target: index,
                        position,
                    })
                }
                _ => None,
            };
            transitions.push(edge);
        }
        current += 1;
    }

    let states: Vec<PositionSet> = states.into_iter().collect();
    let accepting = states.iter().map(|s| s.contains(end)).collect();
    Some(TransitionTable {
        states,
        transitions,
        accepting,
        symbol_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::validators::symbols::SymbolTable;
    use crate::validators::syntax::{SyntaxNode, SyntaxTree};

    /// (a | b)*, c followed by the end marker
    fn star_then_c() -> (SymbolTable, Positions, crate::validators::syntax::FollowSets, usize) {
        let mut symbols = SymbolTable::new();
        let mut positions = Positions::new();
        let mut tree = SyntaxTree::new();

        let mut leaf = |name: &str, tree: &mut SyntaxTree| {
            let p = positions.add(symbols.symbol_for(&QName::local(name)), None);
            tree.add(SyntaxNode::Leaf { position: p })
        };
        let a = leaf("a", &mut tree);
        let b = leaf("b", &mut tree);
        let c = leaf("c", &mut tree);
        let choice = tree.add(SyntaxNode::Choice {
            left: Some(a),
            right: Some(b),
        });
        let star = tree.add(SyntaxNode::Star(choice));
        let body = tree.add(SyntaxNode::Sequence {
            left: Some(star),
            right: Some(c),
        });
        let end = positions.add(Symbol::END_MARKER, None);
        let end_leaf = tree.add(SyntaxNode::Leaf { position: end });
        let root = tree.add(SyntaxNode::Sequence {
            left: Some(body),
            right: Some(end_leaf),
        });
        let sets = tree.compute(root, positions.len());
        (symbols, positions, sets, end)
    }

    #[test]
    fn test_subset_construction() {
        let (symbols, positions, sets, end) = star_then_c();
        let table = build_transition_table(
            &sets.firstpos,
            &sets.followpos,
            &positions,
            symbols.len(),
            end,
            100,
        )
        .unwrap();

        let a = symbols.lookup(&QName::local("a")).unwrap();
        let c = symbols.lookup(&QName::local("c")).unwrap();

        let start = TransitionTable::START;
        assert!(!table.is_accepting(start));
        let after_a = table.next(start, a).unwrap();
        assert_eq!(after_a.position, 0);
        // looping on a stays in the same state
        assert_eq!(table.next(after_a.target, a).unwrap().target, after_a.target);

        let after_c = table.next(after_a.target, c).unwrap();
        assert!(table.is_accepting(after_c.target));
        assert!(table.next(after_c.target, a).is_none());
        assert!(table.next(start, Symbol::END_MARKER).is_none());
    }

    #[test]
    fn test_state_budget() {
        let (symbols, positions, sets, end) = star_then_c();
        assert!(build_transition_table(
            &sets.firstpos,
            &sets.followpos,
            &positions,
            symbols.len(),
            end,
            1,
        )
        .is_none());
    }
}

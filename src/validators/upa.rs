//! Unique Particle Attribution
//!
//! A content model is ambiguous when, from some reachable position set, two
//! positions carrying the same symbol were declared by different particles:
//! the validator could not tell which declaration an incoming element
//! belongs to without looking ahead.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#cos-nonambig

use indexmap::IndexSet;
use log::debug;

use crate::error::AmbiguityError;

use super::positions::{PositionSet, Positions};
use super::ranges::RangeTable;
use super::symbols::SymbolTable;

/// Check one reachable position set
pub fn check_position_set(
    set: &PositionSet,
    positions: &Positions,
    symbols: &SymbolTable,
) -> Result<(), AmbiguityError> {
    let mut claimed: Vec<Option<usize>> = vec![None; symbols.len()];

    for p in set {
        let symbol = positions.symbol(p);
        let Some(index) = symbol.index() else {
            continue;
        };
        let Some(first) = claimed[index] else {
            claimed[index] = Some(p);
            continue;
        };
        if let (Some(first), Some(second)) = (positions.particle(first), positions.particle(p)) {
            if first != second {
                let err = AmbiguityError::new(symbols.describe(symbol), first.clone(), second.clone());
                debug!("{}", err);
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Check every position set a plain model can reach.
///
/// Besides the start set, these are the unions of the follow sets of all
/// positions sharing a symbol, which is what a deterministic matcher would
/// hold after reading that symbol. When the model is unambiguous a symbol
/// occurs once per set, so the exploration stays close to the follow sets
/// themselves.
pub fn check_model(
    firstpos: &PositionSet,
    followpos: &[PositionSet],
    positions: &Positions,
    symbols: &SymbolTable,
) -> Result<(), AmbiguityError> {
    check_reachable(firstpos, followpos, positions, symbols, |set| set.clone())
}

/// Check a range-counting model.
///
/// Range terminals are replaced by everything reachable through them, so
/// that a repetition colliding with what follows the range is caught too.
pub fn check_range_model(
    firstpos: &PositionSet,
    followpos: &[PositionSet],
    ranges: &RangeTable,
    positions: &Positions,
    symbols: &SymbolTable,
) -> Result<(), AmbiguityError> {
    check_reachable(firstpos, followpos, positions, symbols, |set| ranges.expand(set))
}

fn check_reachable<E>(
    firstpos: &PositionSet,
    followpos: &[PositionSet],
    positions: &Positions,
    symbols: &SymbolTable,
    expand: E,
) -> Result<(), AmbiguityError>
where
    E: Fn(&PositionSet) -> PositionSet,
{
    let mut reachable = IndexSet::new();
    reachable.insert(expand(firstpos));

    let mut next = 0;
    while let Some(set) = reachable.get_index(next).cloned() {
        next += 1;
        check_position_set(&set, positions, symbols)?;

        let mut targets: Vec<Option<PositionSet>> = vec![None; symbols.len()];
        for p in &set {
            let Some(index) = positions.symbol(p).index() else {
                continue;
            };
            targets[index]
                .get_or_insert_with(|| PositionSet::new(positions.len()))
                .union_with(&followpos[p]);
        }
        for target in targets.into_iter().flatten() {
            reachable.insert(expand(&target));
        }
    }
    debug!("{} reachable position sets are unambiguous", reachable.len());
    Ok(())
}

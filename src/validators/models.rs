//! Compiled content models
//!
//! A [`ContentValidator`] is built once per complex type and then shared,
//! read-only, by every element instance of that type. The per-instance
//! matching state lives in a separate [`RunState`] owned by the caller:
//!
//! ```text
//! let mut run = validator.new_run();
//! for child in children {
//!     validator.validate_element(&mut run, &child)?;
//! }
//! assert!(validator.complete_validation(&run));
//! ```
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#cvc-complex-type

use indexmap::IndexSet;
use log::trace;
use std::fmt;

use crate::error::MatchError;
use crate::namespaces::QName;

use super::automaton::TransitionTable;
use super::groups::AllGroup;
use super::particles::{ParticleKind, ParticleRef};
use super::positions::{PositionSet, Positions};
use super::ranges::{Configuration, RangeTable};
use super::symbols::SymbolTable;

/// What an element may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// No content at all
    Empty,
    /// Character data only
    TextOnly,
    /// Child elements only, whitespace between them is insignificant
    ElementOnly,
    /// Child elements interleaved with character data
    Mixed,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::TextOnly => write!(f, "text-only"),
            Self::ElementOnly => write!(f, "element-only"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// Runtime representation chosen for a content model
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Representation {
    /// No child elements to match (empty, text-only, any)
    Simple,
    /// Deterministic transition table
    Deterministic {
        /// Number of states
        states: usize,
    },
    /// Position sets, advanced through followpos at run time
    NonDeterministic,
    /// Position sets with one iteration counter per bounded range
    RangeCounting {
        /// Number of bounded ranges
        ranges: usize,
    },
    /// xs:all group
    AllGroup,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Deterministic { states } => write!(f, "deterministic ({} states)", states),
            Self::NonDeterministic => write!(f, "non-deterministic"),
            Self::RangeCounting { ranges } => write!(f, "range-counting ({} ranges)", ranges),
            Self::AllGroup => write!(f, "all group"),
        }
    }
}

/// Matching engine of a compiled model
#[derive(Debug, Clone)]
pub(crate) enum Runtime {
    Deterministic(TransitionTable),
    NonDeterministic,
    RangeCounting(RangeTable),
}

/// Model compiled from a syntax tree
#[derive(Debug, Clone)]
pub(crate) struct CompiledModel {
    pub(crate) symbols: SymbolTable,
    pub(crate) positions: Positions,
    /// Position of the end marker
    pub(crate) end: usize,
    pub(crate) firstpos: PositionSet,
    pub(crate) followpos: Vec<PositionSet>,
    pub(crate) runtime: Runtime,
}

impl CompiledModel {
    fn advance(&self, run: &mut RunState, name: &QName) -> Option<ParticleRef> {
        let position = match &self.runtime {
            Runtime::Deterministic(table) => {
                let transition = self
                    .symbols
                    .candidates(name)
                    .find_map(|symbol| table.next(run.state, symbol))?;
                run.state = transition.target;
                transition.position
            }
            Runtime::NonDeterministic => {
                let (symbol, first) = self.symbols.candidates(name).find_map(|symbol| {
                    run.frontier
                        .iter()
                        .find(|&p| self.positions.symbol(p) == symbol)
                        .map(|p| (symbol, p))
                })?;
                let mut next = PositionSet::new(self.positions.len());
                for p in &run.frontier {
                    if self.positions.symbol(p) == symbol {
                        next.union_with(&self.followpos[p]);
                    }
                }
                run.frontier = next;
                first
            }
            Runtime::RangeCounting(ranges) => {
                let (first, next) = self.symbols.candidates(name).find_map(|symbol| {
                    let mut first: Option<usize> = None;
                    let mut next = IndexSet::new();
                    self.walk_configs(ranges, &run.configs, &mut |p, counters| {
                        if self.positions.symbol(p) == symbol {
                            first = Some(first.map_or(p, |q| q.min(p)));
                            next.insert(Configuration {
                                frontier: self.followpos[p].clone(),
                                counters: counters.to_vec(),
                            });
                        }
                    });
                    first.map(|p| (p, next))
                })?;
                trace!("{} live range configurations", next.len());
                run.configs = next.into_iter().collect();
                first
            }
        };
        trace!("{} matched at position {}", name, position);
        self.positions.particle(position).cloned()
    }

    /// Real positions every live configuration can match next
    fn walk_configs<F>(&self, ranges: &RangeTable, configs: &[Configuration], visit: &mut F)
    where
        F: FnMut(usize, &[u32]),
    {
        for config in configs {
            ranges.walk(&config.frontier, &self.followpos, &config.counters, visit);
        }
    }

    fn is_complete(&self, run: &RunState) -> bool {
        match &self.runtime {
            Runtime::Deterministic(table) => table.is_accepting(run.state),
            Runtime::NonDeterministic => run.frontier.contains(self.end),
            Runtime::RangeCounting(ranges) => {
                let mut complete = false;
                self.walk_configs(ranges, &run.configs, &mut |p, _| complete |= p == self.end);
                complete
            }
        }
    }

    fn expected(&self, run: &RunState, out: &mut Vec<ParticleRef>) {
        let mut push = |p: usize| {
            if let Some(particle) = self.positions.particle(p) {
                if !out.contains(particle) {
                    out.push(particle.clone());
                }
            }
        };
        match &self.runtime {
            Runtime::Deterministic(table) => table.positions_of(run.state).iter().for_each(push),
            Runtime::NonDeterministic => run.frontier.iter().for_each(push),
            Runtime::RangeCounting(ranges) => {
                self.walk_configs(ranges, &run.configs, &mut |p, _| push(p));
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Model {
    Simple,
    Compiled(Box<CompiledModel>),
    All(Box<AllGroup>),
}

/// Per-element matching state.
///
/// Created by [`ContentValidator::new_run`] (or reset with
/// [`ContentValidator::init_run`]) when the element opens, and dropped at
/// its end tag. Never shared between open elements.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Current state of a deterministic table
    state: usize,
    /// Current position set of the position-set engines
    frontier: PositionSet,
    /// Live configurations of a range-counting model
    configs: Vec<Configuration>,
    /// Members of an all group already present
    seen: Vec<bool>,
    /// Number of accepted children
    accepted: usize,
}

impl RunState {
    /// Number of children accepted so far, open content included
    pub fn accepted(&self) -> usize {
        self.accepted
    }
}

/// Immutable compiled content model
#[derive(Debug, Clone)]
pub struct ContentValidator {
    category: ContentCategory,
    open: bool,
    empty_accepted: bool,
    model: Model,
}

static EMPTY: ContentValidator = ContentValidator::EMPTY;
static TEXT_ONLY: ContentValidator = ContentValidator::TEXT_ONLY;
static ANY: ContentValidator = ContentValidator::ANY;

impl ContentValidator {
    /// No content allowed
    pub const EMPTY: ContentValidator = ContentValidator::simple(ContentCategory::Empty, false);

    /// Character data only
    pub const TEXT_ONLY: ContentValidator =
        ContentValidator::simple(ContentCategory::TextOnly, false);

    /// Anything: mixed content where every element is open content
    pub const ANY: ContentValidator = ContentValidator::simple(ContentCategory::Mixed, true);

    const fn simple(category: ContentCategory, open: bool) -> Self {
        Self {
            category,
            open,
            empty_accepted: true,
            model: Model::Simple,
        }
    }

    /// Shared instance of [`ContentValidator::EMPTY`]
    pub fn empty() -> &'static ContentValidator {
        &EMPTY
    }

    /// Shared instance of [`ContentValidator::TEXT_ONLY`]
    pub fn text_only() -> &'static ContentValidator {
        &TEXT_ONLY
    }

    /// Shared instance of [`ContentValidator::ANY`]
    pub fn any() -> &'static ContentValidator {
        &ANY
    }

    /// Validator for a model without any particle
    pub(crate) fn without_particles(category: ContentCategory, open: bool) -> Self {
        match (category, open) {
            (ContentCategory::Mixed, true) => Self::ANY,
            (ContentCategory::Mixed, false) => Self::TEXT_ONLY,
            _ => Self::EMPTY,
        }
    }

    pub(crate) fn compiled(category: ContentCategory, open: bool, model: CompiledModel) -> Self {
        let mut validator = Self {
            category,
            open,
            empty_accepted: false,
            model: Model::Compiled(Box::new(model)),
        };
        // ranges can make the end reachable only through their terminals
        validator.empty_accepted = validator.complete_validation(&validator.new_run());
        validator
    }

    pub(crate) fn all_group(category: ContentCategory, open: bool, group: AllGroup) -> Self {
        Self {
            category,
            open,
            empty_accepted: group.is_emptiable(),
            model: Model::All(Box::new(group)),
        }
    }

    /// Content category
    pub fn content_category(&self) -> ContentCategory {
        self.category
    }

    /// Whether elements the model has no place for are accepted as open content
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether whitespace in the element content is significant
    pub fn is_whitespace_preservable(&self) -> bool {
        matches!(
            self.category,
            ContentCategory::TextOnly | ContentCategory::Mixed
        )
    }

    /// Whether the model accepts no child elements at all
    pub fn is_emptiable(&self) -> bool {
        self.empty_accepted
    }

    /// Runtime representation in use
    pub fn representation(&self) -> Representation {
        match &self.model {
            Model::Simple => Representation::Simple,
            Model::Compiled(model) => match &model.runtime {
                Runtime::Deterministic(table) => Representation::Deterministic {
                    states: table.len(),
                },
                Runtime::NonDeterministic => Representation::NonDeterministic,
                Runtime::RangeCounting(ranges) => Representation::RangeCounting {
                    ranges: ranges.len(),
                },
            },
            Model::All(_) => Representation::AllGroup,
        }
    }

    /// Number of distinct names and wildcards
    pub fn symbol_count(&self) -> usize {
        match &self.model {
            Model::Simple => 0,
            Model::Compiled(model) => model.symbols.len(),
            Model::All(group) => group.len(),
        }
    }

    /// Number of positions, end marker and range terminals included
    pub fn position_count(&self) -> usize {
        match &self.model {
            Model::Compiled(model) => model.positions.len(),
            _ => 0,
        }
    }

    /// Fresh run state for a new element instance
    pub fn new_run(&self) -> RunState {
        let mut run = RunState::default();
        self.init_run(&mut run);
        run
    }

    /// Reset `run` for a new element instance
    pub fn init_run(&self, run: &mut RunState) {
        run.state = TransitionTable::START;
        run.accepted = 0;
        run.frontier = PositionSet::default();
        run.configs.clear();
        run.seen.clear();

        match &self.model {
            Model::Simple => {}
            Model::Compiled(model) => {
                run.frontier = model.firstpos.clone();
                if let Runtime::RangeCounting(ranges) = &model.runtime {
                    run.configs
                        .push(Configuration::initial(&model.firstpos, ranges.len()));
                }
            }
            Model::All(group) => run.seen.resize(group.len(), false),
        }
    }

    /// Match one child element start tag.
    ///
    /// Returns the particle the element was attributed to, or `None` when it
    /// was accepted as open content. On error `run` is left unchanged.
    pub fn validate_element(
        &self,
        run: &mut RunState,
        name: &QName,
    ) -> Result<Option<ParticleRef>, MatchError> {
        let matched = match &self.model {
            Model::Simple => None,
            Model::Compiled(model) => model.advance(run, name),
            Model::All(group) => group.advance(&mut run.seen, name),
        };

        match matched {
            Some(particle) => {
                run.accepted += 1;
                Ok(Some(particle))
            }
            None if self.open => {
                trace!("{} accepted as open content", name);
                run.accepted += 1;
                Ok(None)
            }
            None => Err(self.mismatch(name)),
        }
    }

    fn mismatch(&self, name: &QName) -> MatchError {
        let declared = match &self.model {
            Model::Compiled(model) => {
                !matches!(model.runtime, Runtime::RangeCounting(_))
                    && model.symbols.lookup(name).is_some()
            }
            _ => false,
        };
        let name = name.to_string();
        if declared && self.category == ContentCategory::ElementOnly {
            MatchError::IllFormed { name }
        } else {
            MatchError::UnexpectedElement { name }
        }
    }

    /// Check the end tag: the content seen so far must be a complete match
    pub fn complete_validation(&self, run: &RunState) -> bool {
        if self.category == ContentCategory::Empty && run.accepted > 0 {
            return false;
        }
        match &self.model {
            Model::Simple => true,
            Model::Compiled(model) => model.is_complete(run),
            Model::All(group) => group.is_complete(&run.seen),
        }
    }

    /// [`ContentValidator::complete_validation`] as a `Result`
    pub fn check_complete(&self, run: &RunState) -> Result<(), MatchError> {
        if self.complete_validation(run) {
            Ok(())
        } else {
            Err(MatchError::Incomplete)
        }
    }

    /// Particles that may match the next child element, in position order
    pub fn expected_particles(&self, run: &RunState) -> Vec<ParticleRef> {
        let mut expected = Vec::new();
        match &self.model {
            Model::Simple => {}
            Model::Compiled(model) => model.expected(run, &mut expected),
            Model::All(group) => expected.extend(group.expected(&run.seen)),
        }
        expected
    }

    /// Display names of [`ContentValidator::expected_particles`]
    pub fn expected_names(&self, run: &RunState) -> Vec<String> {
        self.expected_particles(run)
            .iter()
            .map(|particle| match &particle.particle().kind {
                ParticleKind::Element(name) => name.to_string(),
                ParticleKind::Any(constraint) => format!("any[{}]", constraint),
                ParticleKind::Group(model) => format!("{} group", model),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_validators() {
        let empty = ContentValidator::empty();
        assert_eq!(empty.content_category(), ContentCategory::Empty);
        assert!(!empty.is_open());
        assert!(!empty.is_whitespace_preservable());
        assert_eq!(empty.representation(), Representation::Simple);

        let mut run = empty.new_run();
        assert!(empty.complete_validation(&run));
        assert_eq!(
            empty.validate_element(&mut run, &QName::local("a")),
            Err(MatchError::UnexpectedElement {
                name: "a".to_string()
            })
        );
        assert!(empty.complete_validation(&run));

        let text = ContentValidator::text_only();
        assert!(text.is_whitespace_preservable());
        assert!(text
            .validate_element(&mut text.new_run(), &QName::local("a"))
            .is_err());
    }

    #[test]
    fn test_any_accepts_everything() {
        let any = ContentValidator::any();
        let mut run = any.new_run();
        assert_eq!(any.validate_element(&mut run, &QName::local("a")), Ok(None));
        assert_eq!(
            any.validate_element(&mut run, &QName::namespaced("urn:x", "b")),
            Ok(None)
        );
        assert_eq!(run.accepted(), 2);
        assert!(any.complete_validation(&run));
        assert!(any.is_whitespace_preservable());
        assert!(any.expected_particles(&run).is_empty());
    }

    #[test]
    fn test_statics_are_shared() {
        assert!(std::ptr::eq(ContentValidator::any(), ContentValidator::any()));
    }

    #[test]
    fn test_representation_display() {
        assert_eq!(
            Representation::Deterministic { states: 3 }.to_string(),
            "deterministic (3 states)"
        );
        assert_eq!(
            Representation::RangeCounting { ranges: 1 }.to_string(),
            "range-counting (1 ranges)"
        );
        assert_eq!(ContentCategory::TextOnly.to_string(), "text-only");
    }
}

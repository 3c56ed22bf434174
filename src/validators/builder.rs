//! Stack-based content model assembly
//!
//! Schema-reading code walks a model group and replays it as a flat series
//! of calls; the builder keeps a stack of partially built subtrees. For the
//! group `(a, b*)`:
//!
//! ```text
//! open_group()
//! add_name(a)      stack: [_, a]
//! add_sequence()   stack: [_, (a, ?)]
//! add_name(b)      stack: [_, (a, b)]       partial
//! add_star()       stack: [_, (a, b*)]
//! close_group()
//! ```
//!
//! Operators leave their right operand pending on the stack, so a quantifier
//! applied right after an operand wraps that operand only.

use log::debug;

use crate::error::Result;
use crate::limits::Limits;
use crate::namespaces::QName;

use super::automaton::build_transition_table;
use super::models::{CompiledModel, ContentCategory, ContentValidator, Runtime};
use super::particles::{Occurs, ParticleRef};
use super::positions::Positions;
use super::ranges::RangeTable;
use super::symbols::{Symbol, SymbolTable};
use super::syntax::{NodeId, SyntaxNode, SyntaxTree};
use super::upa;
use super::wildcards::NamespaceConstraint;

/// Compilation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Build a transition table when no ambiguity check requires one
    pub prefer_deterministic: bool,
    /// Reject ambiguous models; implies an attempt at a transition table
    pub enforce_upa: bool,
    /// Resource limits, of which only the state budget is used here
    pub limits: Limits,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            prefer_deterministic: true,
            enforce_upa: true,
            limits: Limits::default(),
        }
    }
}

impl CompileOptions {
    /// Whether subset construction should be attempted
    pub fn wants_transition_table(&self) -> bool {
        self.enforce_upa || self.prefer_deterministic
    }
}

/// Assembles one content model and compiles it
#[derive(Debug, Clone)]
pub struct ContentModelBuilder {
    category: ContentCategory,
    open: bool,
    symbols: SymbolTable,
    positions: Positions,
    tree: SyntaxTree,
    /// `None` entries are group brackets
    stack: Vec<Option<NodeId>>,
    content: Option<NodeId>,
    /// The top of the stack is an operator whose right operand was just set
    is_partial: bool,
    range_count: usize,
}

impl ContentModelBuilder {
    /// Start a model for content of the given category
    pub fn new(category: ContentCategory) -> Self {
        Self {
            category,
            open: false,
            symbols: SymbolTable::new(),
            positions: Positions::new(),
            tree: SyntaxTree::new(),
            stack: Vec::new(),
            content: None,
            is_partial: false,
            range_count: 0,
        }
    }

    /// Accept unmatched elements as open content
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Content category the model was started with
    pub fn content_category(&self) -> ContentCategory {
        self.category
    }

    /// Number of bounded ranges added so far
    pub fn range_count(&self) -> usize {
        self.range_count
    }

    /// Open a bracketed group
    pub fn open_group(&mut self) {
        self.stack.push(None);
    }

    /// Close the innermost group
    pub fn close_group(&mut self) {
        let Some(Some(node)) = self.stack.pop() else {
            // nothing was added inside the group
            return;
        };
        if self.stack.is_empty() {
            self.content = Some(node);
            self.is_partial = false;
            return;
        }
        let (node, attached) = self.attach(node);
        self.stack.push(Some(node));
        self.is_partial = attached;
    }

    /// Combine a finished term with the top of the stack.
    ///
    /// A pending operator takes the term as its right operand; a complete
    /// term on top is sequenced with it; a bracket is consumed.
    fn attach(&mut self, node: NodeId) -> (NodeId, bool) {
        match self.stack.pop() {
            Some(Some(top))
                if self.tree.node(top).is_interior() && self.tree.right_child(top).is_none() =>
            {
                self.tree.set_right_child(top, node);
                (top, true)
            }
            Some(Some(top)) => {
                let sequence = self.tree.add(SyntaxNode::Sequence {
                    left: Some(top),
                    right: Some(node),
                });
                (sequence, true)
            }
            Some(None) | None => (node, false),
        }
    }

    /// Add an element name
    pub fn add_name(&mut self, name: &QName, particle: ParticleRef) {
        let symbol = self.symbols.symbol_for(name);
        self.add_leaf(symbol, particle);
    }

    /// Add a wildcard
    pub fn add_wildcard(&mut self, constraint: &NamespaceConstraint, particle: ParticleRef) {
        let symbol = self.symbols.symbol_for_wildcard(constraint);
        self.add_leaf(symbol, particle);
    }

    fn add_leaf(&mut self, symbol: Symbol, particle: ParticleRef) {
        let position = self.positions.add(symbol, Some(particle));
        let leaf = self.tree.add(SyntaxNode::Leaf { position });
        let (node, _) = self.attach(leaf);
        self.stack.push(Some(node));
        self.is_partial = true;
    }

    /// Turn the top term into the left operand of a choice
    pub fn add_choice(&mut self) {
        self.add_operator(|left| SyntaxNode::Choice { left, right: None });
    }

    /// Turn the top term into the left operand of a sequence
    pub fn add_sequence(&mut self) {
        self.add_operator(|left| SyntaxNode::Sequence { left, right: None });
    }

    fn add_operator(&mut self, make: impl FnOnce(Option<NodeId>) -> SyntaxNode) {
        let left = self.stack.pop().flatten();
        let node = self.tree.add(make(left));
        self.stack.push(Some(node));
    }

    /// Zero or more of the last term
    pub fn add_star(&mut self) {
        self.closure(|tree, operand| tree.add(SyntaxNode::Star(operand)));
    }

    /// One or more of the last term
    pub fn add_plus(&mut self) {
        self.closure(|tree, operand| tree.add(SyntaxNode::Plus(operand)));
    }

    /// Zero or one of the last term
    pub fn add_optional(&mut self) {
        self.closure(|tree, operand| tree.add(SyntaxNode::Optional(operand)));
    }

    /// Between `min` and `max` (`None` = unbounded) iterations of the last term
    pub fn add_bounded_range(&mut self, min: u32, max: Option<u32>) {
        if max == Some(0) {
            // the body can never occur
            self.closure(|tree, _| tree.add(SyntaxNode::Empty));
            return;
        }
        let position = self.positions.add(Symbol::RANGE_TERMINAL, None);
        self.closure(|tree, body| {
            let terminal = tree.add(SyntaxNode::LeafRange {
                position,
                min,
                max,
                next_iteration: None,
            });
            let range = tree.add(SyntaxNode::Sequence {
                left: Some(body),
                right: Some(terminal),
            });
            if min == 0 {
                // the terminal is never nullable, so skipping needs its own node
                tree.add(SyntaxNode::Optional(range))
            } else {
                range
            }
        });
        self.range_count += 1;
    }

    /// Apply occurrence bounds to the last term, using the closure nodes
    /// whenever the bounds allow it
    pub fn add_occurs(&mut self, occurs: Occurs) {
        match (occurs.min, occurs.max) {
            (1, Some(1)) => {}
            (0, Some(1)) => self.add_optional(),
            (0, None) => self.add_star(),
            (1, None) => self.add_plus(),
            (min, max) => self.add_bounded_range(min, max),
        }
    }

    /// Wrap the most recently completed term
    fn closure(&mut self, wrap: impl FnOnce(&mut SyntaxTree, NodeId) -> NodeId) {
        match self.stack.pop() {
            Some(Some(top)) => {
                let operand = if self.is_partial && self.tree.node(top).is_interior() {
                    self.tree.right_child(top)
                } else {
                    None
                };
                match operand {
                    Some(operand) => {
                        let node = wrap(&mut self.tree, operand);
                        self.tree.set_right_child(top, node);
                        self.stack.push(Some(top));
                    }
                    None => {
                        let node = wrap(&mut self.tree, top);
                        self.stack.push(Some(node));
                        self.is_partial = false;
                    }
                }
            }
            Some(None) => {
                // quantifier directly after a bracket applies to nothing
                self.stack.push(None);
            }
            None => {
                if let Some(content) = self.content {
                    self.content = Some(wrap(&mut self.tree, content));
                }
            }
        }
    }

    /// Compile with default options except for `prefer_deterministic`
    pub fn finish(self, prefer_deterministic: bool) -> Result<ContentValidator> {
        self.finish_with(&CompileOptions {
            prefer_deterministic,
            ..CompileOptions::default()
        })
    }

    /// Compile the model.
    ///
    /// Unclosed groups are closed first. Fails only when `enforce_upa` is set
    /// and the model is ambiguous.
    pub fn finish_with(mut self, options: &CompileOptions) -> Result<ContentValidator> {
        while !self.stack.is_empty() {
            self.close_group();
        }
        let Some(content) = self.content else {
            debug!("no particles, {} content", self.category);
            return Ok(ContentValidator::without_particles(
                self.category,
                self.open,
            ));
        };

        let end = self.positions.add(Symbol::END_MARKER, None);
        let end_leaf = self.tree.add(SyntaxNode::Leaf { position: end });
        let root = self.tree.add(SyntaxNode::Sequence {
            left: Some(content),
            right: Some(end_leaf),
        });
        let sets = self.tree.compute(root, self.positions.len());
        let symbols = self.symbols;
        let positions = self.positions;

        let runtime = if self.range_count > 0 {
            let ranges = RangeTable::new(sets.ranges, &sets.followpos, &positions);
            if options.enforce_upa {
                upa::check_range_model(&sets.firstpos, &sets.followpos, &ranges, &positions, &symbols)?;
            }
            debug!(
                "range-counting model with {} ranges over {} positions",
                ranges.len(),
                positions.len()
            );
            Runtime::RangeCounting(ranges)
        } else {
            if options.enforce_upa {
                upa::check_model(&sets.firstpos, &sets.followpos, &positions, &symbols)?;
            }
            if options.wants_transition_table() {
                let max_states = options.limits.max_dfa_states(positions.len());
                match build_transition_table(
                    &sets.firstpos,
                    &sets.followpos,
                    &positions,
                    symbols.len(),
                    end,
                    max_states,
                ) {
                    Some(table) => {
                        debug!(
                            "deterministic model with {} states over {} positions",
                            table.len(),
                            positions.len()
                        );
                        Runtime::Deterministic(table)
                    }
                    None => {
                        debug!(
                            "state budget of {} exceeded, keeping position sets",
                            max_states
                        );
                        Runtime::NonDeterministic
                    }
                }
            } else {
                debug!("determinization skipped over {} positions", positions.len());
                Runtime::NonDeterministic
            }
        };

        Ok(ContentValidator::compiled(
            self.category,
            self.open,
            CompiledModel {
                symbols,
                positions,
                end,
                firstpos: sets.firstpos,
                followpos: sets.followpos,
                runtime,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, MatchError};
    use crate::validators::models::Representation;
    use crate::validators::particles::Particle;

    fn element(name: &str) -> (QName, ParticleRef) {
        let name = QName::local(name);
        let particle = ParticleRef::new(Particle::element(name.clone(), Occurs::once()));
        (name, particle)
    }

    fn accepts(validator: &ContentValidator, children: &[&str]) -> bool {
        let mut run = validator.new_run();
        children
            .iter()
            .all(|c| validator.validate_element(&mut run, &QName::local(*c)).is_ok())
            && validator.complete_validation(&run)
    }

    #[test]
    fn test_star_binds_to_last_term() {
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        let (b, pb) = element("b");
        builder.add_name(&a, pa);
        builder.add_sequence();
        builder.add_name(&b, pb);
        builder.add_star();
        let validator = builder.finish(true).unwrap();

        assert!(accepts(&validator, &["a"]));
        assert!(accepts(&validator, &["a", "b", "b", "b"]));
        assert!(!accepts(&validator, &["a", "a"]));
        assert!(!accepts(&validator, &[]));
    }

    #[test]
    fn test_star_after_group_wraps_group() {
        // (a, b)*
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        let (b, pb) = element("b");
        builder.open_group();
        builder.add_name(&a, pa);
        builder.add_sequence();
        builder.add_name(&b, pb);
        builder.close_group();
        builder.add_star();
        let validator = builder.finish(true).unwrap();

        assert!(accepts(&validator, &[]));
        assert!(accepts(&validator, &["a", "b", "a", "b"]));
        assert!(!accepts(&validator, &["a", "b", "a"]));
    }

    #[test]
    fn test_empty_group_collapses() {
        // (a, ()) behaves as (a)
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        builder.open_group();
        builder.add_name(&a, pa);
        builder.add_sequence();
        builder.open_group();
        builder.close_group();
        builder.close_group();
        let validator = builder.finish(true).unwrap();

        assert!(accepts(&validator, &["a"]));
        assert!(!accepts(&validator, &[]));
    }

    #[test]
    fn test_no_particles() {
        let builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let validator = builder.finish(true).unwrap();
        assert_eq!(validator.content_category(), ContentCategory::Empty);

        let mut builder = ContentModelBuilder::new(ContentCategory::Mixed);
        builder.open_group();
        builder.close_group();
        assert_eq!(
            builder.finish(true).unwrap().content_category(),
            ContentCategory::TextOnly
        );

        let mut builder = ContentModelBuilder::new(ContentCategory::Mixed);
        builder.set_open(true);
        let validator = builder.finish(true).unwrap();
        assert!(validator.is_open());
    }

    #[test]
    fn test_choice_of_same_particle() {
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        builder.add_name(&a, pa.clone());
        builder.add_choice();
        builder.add_name(&a, pa);
        assert!(builder.finish(true).is_ok());
    }

    #[test]
    fn test_choice_of_distinct_particles() {
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, first) = element("a");
        let (_, second) = element("a");
        builder.add_name(&a, first.clone());
        builder.add_choice();
        builder.add_name(&a, second.clone());
        match builder.finish(true) {
            Err(Error::Ambiguity(err)) => {
                assert!(err.involves(&first));
                assert!(err.involves(&second));
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguity_can_be_tolerated() {
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, first) = element("a");
        let (_, second) = element("a");
        builder.add_name(&a, first);
        builder.add_choice();
        builder.add_name(&a, second);
        let options = CompileOptions {
            enforce_upa: false,
            prefer_deterministic: false,
            ..CompileOptions::default()
        };
        let validator = builder.finish_with(&options).unwrap();
        assert_eq!(validator.representation(), Representation::NonDeterministic);
        assert!(accepts(&validator, &["a"]));
    }

    #[test]
    fn test_representation_choice() {
        let build = |options: &CompileOptions| {
            let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
            let (a, pa) = element("a");
            let (b, pb) = element("b");
            builder.add_name(&a, pa);
            builder.add_sequence();
            builder.add_name(&b, pb);
            builder.add_optional();
            builder.finish_with(options).unwrap().representation()
        };

        assert!(matches!(
            build(&CompileOptions::default()),
            Representation::Deterministic { .. }
        ));

        // the ambiguity check still asks for a table
        let upa_only = CompileOptions {
            prefer_deterministic: false,
            ..CompileOptions::default()
        };
        assert!(matches!(
            build(&upa_only),
            Representation::Deterministic { .. }
        ));

        let tiny_budget = CompileOptions {
            limits: Limits {
                dfa_state_budget: 1,
                ..Limits::default()
            },
            ..CompileOptions::default()
        };
        assert_eq!(build(&tiny_budget), Representation::NonDeterministic);
    }

    #[test]
    fn test_bounded_range() {
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        builder.add_name(&a, pa);
        builder.add_bounded_range(2, Some(4));
        assert_eq!(builder.range_count(), 1);
        let validator = builder.finish(true).unwrap();
        assert_eq!(
            validator.representation(),
            Representation::RangeCounting { ranges: 1 }
        );

        assert!(!accepts(&validator, &["a"]));
        assert!(accepts(&validator, &["a", "a"]));
        assert!(accepts(&validator, &["a", "a", "a", "a"]));
        assert!(!accepts(&validator, &["a", "a", "a", "a", "a"]));
    }

    #[test]
    fn test_optional_bounded_range() {
        // (a{0,3}, b)
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        let (b, pb) = element("b");
        builder.add_name(&a, pa);
        builder.add_bounded_range(0, Some(3));
        builder.add_sequence();
        builder.add_name(&b, pb);
        let validator = builder.finish(true).unwrap();

        assert!(accepts(&validator, &["b"]));
        assert!(accepts(&validator, &["a", "a", "a", "b"]));
        assert!(!accepts(&validator, &["a", "a", "a", "a", "b"]));
    }

    #[test]
    fn test_ill_formed_vs_unexpected() {
        let mut builder = ContentModelBuilder::new(ContentCategory::ElementOnly);
        let (a, pa) = element("a");
        let (b, pb) = element("b");
        builder.add_name(&a, pa);
        builder.add_sequence();
        builder.add_name(&b, pb);
        let validator = builder.finish(true).unwrap();

        let mut run = validator.new_run();
        assert_eq!(
            validator.validate_element(&mut run, &QName::local("b")),
            Err(MatchError::IllFormed {
                name: "b".to_string()
            })
        );
        assert_eq!(
            validator.validate_element(&mut run, &QName::local("z")),
            Err(MatchError::UnexpectedElement {
                name: "z".to_string()
            })
        );
        // failures leave the run untouched
        assert!(validator.validate_element(&mut run, &QName::local("a")).is_ok());
    }
}

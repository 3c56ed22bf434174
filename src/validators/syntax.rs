//! Content-model syntax tree
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]; every
//! interior node owns its children exclusively, so the tree can never share
//! subtrees or form cycles. Leaves refer to entries of the position table.
//!
//! [`SyntaxTree::compute`] performs the Glushkov construction: `nullable`,
//! `firstpos` and `lastpos` bottom-up for every node, and the global
//! `followpos` table indexed by position.

use super::particles::Occurs;
use super::positions::PositionSet;

/// Index of a node in the [`SyntaxTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the content-model syntax tree
#[derive(Debug, Clone)]
pub enum SyntaxNode {
    /// Occurrence of one symbol
    Leaf {
        /// Position table index
        position: usize,
    },
    /// Terminal of a numeric occurrence range; always the right child of
    /// the sequence whose left child is the repeated body
    LeafRange {
        /// Position table index
        position: usize,
        /// Minimum iteration count
        min: u32,
        /// Maximum iteration count, `None` for unbounded
        max: Option<u32>,
        /// Positions that start another iteration of the body; filled in
        /// by [`SyntaxTree::compute`] only when `min != max`
        next_iteration: Option<PositionSet>,
    },
    /// Left then right; `right` is `None` while the builder waits for it
    Sequence {
        /// First operand
        left: Option<NodeId>,
        /// Second operand
        right: Option<NodeId>,
    },
    /// Left or right; `right` is `None` while the builder waits for it
    Choice {
        /// First alternative
        left: Option<NodeId>,
        /// Second alternative
        right: Option<NodeId>,
    },
    /// Zero or more
    Star(NodeId),
    /// One or more
    Plus(NodeId),
    /// Zero or one
    Optional(NodeId),
    /// Matches only the empty sequence
    Empty,
}

impl SyntaxNode {
    /// Check if this is a sequence or choice node
    pub fn is_interior(&self) -> bool {
        matches!(self, Self::Sequence { .. } | Self::Choice { .. })
    }
}

/// Per-node results of the Glushkov construction
#[derive(Debug, Clone)]
pub struct NodeSets {
    /// The node can match the empty sequence
    pub nullable: bool,
    /// Positions that can start the node
    pub firstpos: PositionSet,
    /// Positions that can end the node
    pub lastpos: PositionSet,
}

/// Bounded occurrence range found while computing the tree
#[derive(Debug, Clone)]
pub struct RangeLeaf {
    /// Position of the range terminal
    pub terminal: usize,
    /// Minimum iteration count; zero when the body itself is nullable
    pub min: u32,
    /// Maximum iteration count
    pub max: Option<u32>,
    /// Positions starting an iteration of the body
    pub body_first: PositionSet,
}

impl RangeLeaf {
    /// The range can repeat without a fixed iteration count
    pub fn is_ambiguous(&self) -> bool {
        self.max != Some(self.min)
    }

    /// Iteration bounds
    pub fn occurs(&self) -> Occurs {
        Occurs::new(self.min, self.max)
    }
}

/// Output of [`SyntaxTree::compute`]
#[derive(Debug, Clone)]
pub struct FollowSets {
    /// Whether the whole model accepts the empty sequence
    pub nullable: bool,
    /// firstpos of the root
    pub firstpos: PositionSet,
    /// followpos, indexed by position
    pub followpos: Vec<PositionSet>,
    /// Range terminals in position order
    pub ranges: Vec<RangeLeaf>,
}

/// Arena of syntax nodes
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node
    pub fn add(&mut self, node: SyntaxNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode {
        &mut self.nodes[id.0]
    }

    /// Number of allocated nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no node was allocated
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Right child of a sequence or choice node
    pub fn right_child(&self, id: NodeId) -> Option<NodeId> {
        match self.node(id) {
            SyntaxNode::Sequence { right, .. } | SyntaxNode::Choice { right, .. } => *right,
            _ => None,
        }
    }

    /// Replace the right child of a sequence or choice node
    pub fn set_right_child(&mut self, id: NodeId, child: NodeId) {
        if let SyntaxNode::Sequence { right, .. } | SyntaxNode::Choice { right, .. } =
            self.node_mut(id)
        {
            *right = Some(child);
        }
    }

    /// Compute nullable/firstpos/lastpos for every node under `root` and the
    /// followpos table over `position_count` positions.
    pub fn compute(&mut self, root: NodeId, position_count: usize) -> FollowSets {
        let mut followpos = vec![PositionSet::new(position_count); position_count];
        let mut ranges = Vec::new();
        let sets = self.visit(root, position_count, &mut followpos, &mut ranges);
        ranges.sort_by_key(|r: &RangeLeaf| r.terminal);
        FollowSets {
            nullable: sets.nullable,
            firstpos: sets.firstpos,
            followpos,
            ranges,
        }
    }

    fn visit(
        &mut self,
        id: NodeId,
        n: usize,
        followpos: &mut [PositionSet],
        ranges: &mut Vec<RangeLeaf>,
    ) -> NodeSets {
        match self.node(id).clone() {
            SyntaxNode::Leaf { position } | SyntaxNode::LeafRange { position, .. } => {
                let mut set = PositionSet::new(n);
                set.insert(position);
                NodeSets {
                    nullable: false,
                    firstpos: set.clone(),
                    lastpos: set,
                }
            }
            SyntaxNode::Sequence { left, right } => match (left, right) {
                (Some(left), Some(right)) => {
                    let l = self.visit(left, n, followpos, ranges);
                    let r = self.visit(right, n, followpos, ranges);
                    for p in &l.lastpos {
                        followpos[p].union_with(&r.firstpos);
                    }
                    if let SyntaxNode::LeafRange {
                        position,
                        min,
                        max,
                        next_iteration,
                    } = self.node_mut(right)
                    {
                        if l.nullable {
                            *min = 0;
                        }
                        *next_iteration = (Some(*min) != *max).then(|| l.firstpos.clone());
                        ranges.push(RangeLeaf {
                            terminal: *position,
                            min: *min,
                            max: *max,
                            body_first: l.firstpos.clone(),
                        });
                    }
                    let mut firstpos = l.firstpos.clone();
                    if l.nullable {
                        firstpos.union_with(&r.firstpos);
                    }
                    let mut lastpos = r.lastpos.clone();
                    if r.nullable {
                        lastpos.union_with(&l.lastpos);
                    }
                    NodeSets {
                        nullable: l.nullable && r.nullable,
                        firstpos,
                        lastpos,
                    }
                }
                (Some(only), None) | (None, Some(only)) => self.visit(only, n, followpos, ranges),
                (None, None) => NodeSets {
                    nullable: true,
                    firstpos: PositionSet::new(n),
                    lastpos: PositionSet::new(n),
                },
            },
            SyntaxNode::Choice { left, right } => match (left, right) {
                (Some(left), Some(right)) => {
                    let l = self.visit(left, n, followpos, ranges);
                    let r = self.visit(right, n, followpos, ranges);
                    let mut firstpos = l.firstpos;
                    firstpos.union_with(&r.firstpos);
                    let mut lastpos = l.lastpos;
                    lastpos.union_with(&r.lastpos);
                    NodeSets {
                        nullable: l.nullable || r.nullable,
                        firstpos,
                        lastpos,
                    }
                }
                (Some(only), None) | (None, Some(only)) => self.visit(only, n, followpos, ranges),
                (None, None) => NodeSets {
                    nullable: true,
                    firstpos: PositionSet::new(n),
                    lastpos: PositionSet::new(n),
                },
            },
            SyntaxNode::Star(child) | SyntaxNode::Plus(child) => {
                let c = self.visit(child, n, followpos, ranges);
                for p in &c.lastpos {
                    followpos[p].union_with(&c.firstpos);
                }
                let nullable = matches!(self.node(id), SyntaxNode::Star(_)) || c.nullable;
                NodeSets { nullable, ..c }
            }
            SyntaxNode::Optional(child) => {
                let c = self.visit(child, n, followpos, ranges);
                NodeSets {
                    nullable: true,
                    ..c
                }
            }
            SyntaxNode::Empty => NodeSets {
                nullable: true,
                firstpos: PositionSet::new(n),
                lastpos: PositionSet::new(n),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut SyntaxTree, position: usize) -> NodeId {
        tree.add(SyntaxNode::Leaf { position })
    }

    fn positions(set: &PositionSet) -> Vec<usize> {
        set.iter().collect()
    }

    #[test]
    fn test_sequence_with_star() {
        // (a, b*) followed by the end marker at position 2
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, 0);
        let b = leaf(&mut tree, 1);
        let star = tree.add(SyntaxNode::Star(b));
        let body = tree.add(SyntaxNode::Sequence {
            left: Some(a),
            right: Some(star),
        });
        let end = leaf(&mut tree, 2);
        let root = tree.add(SyntaxNode::Sequence {
            left: Some(body),
            right: Some(end),
        });

        let sets = tree.compute(root, 3);
        assert!(!sets.nullable);
        assert_eq!(positions(&sets.firstpos), vec![0]);
        assert_eq!(positions(&sets.followpos[0]), vec![1, 2]);
        assert_eq!(positions(&sets.followpos[1]), vec![1, 2]);
        assert!(sets.followpos[2].is_empty());
        assert!(sets.ranges.is_empty());
    }

    #[test]
    fn test_choice_and_optional() {
        // (a | b)?
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, 0);
        let b = leaf(&mut tree, 1);
        let choice = tree.add(SyntaxNode::Choice {
            left: Some(a),
            right: Some(b),
        });
        let opt = tree.add(SyntaxNode::Optional(choice));

        let sets = tree.compute(opt, 2);
        assert!(sets.nullable);
        assert_eq!(positions(&sets.firstpos), vec![0, 1]);
    }

    #[test]
    fn test_pending_right_slot_is_ignored() {
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, 0);
        let seq = tree.add(SyntaxNode::Sequence {
            left: Some(a),
            right: None,
        });
        let sets = tree.compute(seq, 1);
        assert!(!sets.nullable);
        assert_eq!(positions(&sets.firstpos), vec![0]);
    }

    #[test]
    fn test_range_leaf_next_iteration() {
        // a{2,4}: Sequence(a, range terminal)
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, 0);
        let range = tree.add(SyntaxNode::LeafRange {
            position: 1,
            min: 2,
            max: Some(4),
            next_iteration: None,
        });
        let seq = tree.add(SyntaxNode::Sequence {
            left: Some(a),
            right: Some(range),
        });

        let sets = tree.compute(seq, 2);
        assert_eq!(positions(&sets.followpos[0]), vec![1]);
        assert!(sets.followpos[1].is_empty());
        assert_eq!(sets.ranges.len(), 1);
        assert_eq!(sets.ranges[0].terminal, 1);
        assert_eq!(positions(&sets.ranges[0].body_first), vec![0]);
        match tree.node(range) {
            SyntaxNode::LeafRange { next_iteration, .. } => {
                assert_eq!(next_iteration.as_ref().map(positions), Some(vec![0]));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_fixed_range_has_no_next_iteration() {
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, 0);
        let range = tree.add(SyntaxNode::LeafRange {
            position: 1,
            min: 3,
            max: Some(3),
            next_iteration: None,
        });
        let seq = tree.add(SyntaxNode::Sequence {
            left: Some(a),
            right: Some(range),
        });

        let sets = tree.compute(seq, 2);
        assert!(!sets.ranges[0].is_ambiguous());
        assert!(matches!(
            tree.node(range),
            SyntaxNode::LeafRange {
                next_iteration: None,
                ..
            }
        ));
    }

    #[test]
    fn test_nullable_body_lowers_min() {
        // (a?){2,3}
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, 0);
        let opt = tree.add(SyntaxNode::Optional(a));
        let range = tree.add(SyntaxNode::LeafRange {
            position: 1,
            min: 2,
            max: Some(3),
            next_iteration: None,
        });
        let seq = tree.add(SyntaxNode::Sequence {
            left: Some(opt),
            right: Some(range),
        });

        let sets = tree.compute(seq, 2);
        assert_eq!(sets.ranges[0].min, 0);
        assert_eq!(positions(&sets.firstpos), vec![0, 1]);
    }
}

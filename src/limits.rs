//! Limits and constraints for content-model compilation
//!
//! Subset construction can blow up exponentially in the number of positions,
//! so the deterministic table is capped by a state budget. Running over the
//! budget is not an error: the compiler keeps the non-deterministic form.
//! The notation parser has its own guards against pathological input.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Total budget shared by all positions; the maximum number of
    /// deterministic states is `dfa_state_budget / position_count`
    pub dfa_state_budget: usize,

    /// Maximum group nesting depth accepted by the notation parser
    pub max_nesting_depth: usize,

    /// Largest numeric bound accepted in a `{m,n}` occurrence literal
    pub max_occurs_literal: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            dfa_state_budget: 8192,
            max_nesting_depth: 256,
            max_occurs_literal: 1_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            dfa_state_budget: 1024,
            max_nesting_depth: 32,
            max_occurs_literal: 10_000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            dfa_state_budget: 1 << 20,
            max_nesting_depth: 4096,
            max_occurs_literal: u32::MAX - 1,
        }
    }

    /// Maximum number of deterministic states for a model with
    /// `position_count` positions. Never less than one.
    pub fn max_dfa_states(&self, position_count: usize) -> usize {
        (self.dfa_state_budget / position_count.max(1)).max(1)
    }

    /// Check if a group nesting depth is within limits
    pub fn check_nesting_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_nesting_depth {
            Err(Error::LimitExceeded(format!(
                "group nesting depth {} exceeds maximum {}",
                depth, self.max_nesting_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if an occurrence literal is within limits
    pub fn check_occurs_literal(&self, value: u32) -> Result<()> {
        if value > self.max_occurs_literal {
            Err(Error::LimitExceeded(format!(
                "occurrence bound {} exceeds maximum {}",
                value, self.max_occurs_literal
            )))
        } else {
            Ok(())
        }
    }
}

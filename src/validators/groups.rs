//! XSD Model Groups
//!
//! Sequences and choices are compiled through the syntax tree by
//! [`ContentModelBuilder`](super::builder::ContentModelBuilder). An `xs:all`
//! group has no useful position-automaton form (every permutation of its
//! members is valid), so it gets a matcher of its own here: each member may
//! appear at most once, in any order.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Model_Groups

use log::debug;

use crate::error::{AmbiguityError, Result};
use crate::namespaces::QName;

use super::models::{ContentCategory, ContentValidator};
use super::particles::ParticleRef;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelType {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of particles
    All,
}

impl ModelType {
    /// Parse from element tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" | "{http://www.w3.org/2001/XMLSchema}sequence" => Some(Self::Sequence),
            "choice" | "{http://www.w3.org/2001/XMLSchema}choice" => Some(Self::Choice),
            "all" | "{http://www.w3.org/2001/XMLSchema}all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone)]
struct AllMember {
    name: QName,
    particle: ParticleRef,
    required: bool,
}

/// Compiled xs:all group
#[derive(Debug, Clone, Default)]
pub struct AllGroup {
    members: Vec<AllMember>,
}

impl AllGroup {
    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group has no member
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if every member is optional
    pub fn is_emptiable(&self) -> bool {
        self.members.iter().all(|m| !m.required)
    }

    pub(crate) fn advance(&self, seen: &mut [bool], name: &QName) -> Option<ParticleRef> {
        let index = self.members.iter().position(|m| &m.name == name)?;
        let slot = seen.get_mut(index)?;
        if *slot {
            return None;
        }
        *slot = true;
        Some(self.members[index].particle.clone())
    }

    pub(crate) fn is_complete(&self, seen: &[bool]) -> bool {
        self.members
            .iter()
            .enumerate()
            .all(|(i, m)| !m.required || seen.get(i).copied().unwrap_or(false))
    }

    pub(crate) fn expected(&self, seen: &[bool]) -> impl Iterator<Item = ParticleRef> + '_ {
        let seen = seen.to_vec();
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, _)| !seen.get(*i).copied().unwrap_or(false))
            .map(|(_, m)| m.particle.clone())
    }
}

/// Builder for xs:all content models
#[derive(Debug, Clone)]
pub struct AllGroupBuilder {
    category: ContentCategory,
    open: bool,
    group: AllGroup,
}

impl AllGroupBuilder {
    /// Start a new all group for content of the given category
    pub fn new(category: ContentCategory) -> Self {
        Self {
            category,
            open: false,
            group: AllGroup::default(),
        }
    }

    /// Accept elements without a member as open content
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Add a member element.
    ///
    /// Adding the same particle twice only strengthens its `required` flag;
    /// the same name under a different particle is ambiguous.
    pub fn add_element(&mut self, name: QName, particle: ParticleRef, required: bool) -> Result<()> {
        if let Some(member) = self.group.members.iter_mut().find(|m| m.name == name) {
            if member.particle != particle {
                let err = AmbiguityError::new(name.to_string(), member.particle.clone(), particle);
                debug!("{}", err);
                return Err(err.into());
            }
            member.required |= required;
            return Ok(());
        }
        self.group.members.push(AllMember {
            name,
            particle,
            required,
        });
        Ok(())
    }

    /// Produce the content validator
    pub fn finish(self) -> ContentValidator {
        if self.group.is_empty() {
            return ContentValidator::without_particles(self.category, self.open);
        }
        debug!("all group with {} members", self.group.len());
        ContentValidator::all_group(self.category, self.open, self.group)
    }
}

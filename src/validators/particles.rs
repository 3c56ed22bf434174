//! XSD Particle Schema Components
//!
//! Particles carry the occurrence constraints (minOccurs, maxOccurs) of an
//! element declaration, wildcard or model group. The content-model engine
//! only ever sees them through [`ParticleRef`], an identity handle it uses
//! to attribute matches and to report ambiguities.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#p

use crate::error::{ParseError, Result};
use crate::namespaces::QName;
use std::fmt;
use std::sync::Arc;

use super::groups::ModelType;
use super::wildcards::NamespaceConstraint;

/// Occurrence bounds of a particle; `max: None` stands for "unbounded"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Occurs {
    /// minOccurs
    pub min: u32,
    /// maxOccurs
    pub max: Option<u32>,
}

impl Occurs {
    /// Arbitrary bounds
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// `{1,1}`, the XSD default
    pub const fn once() -> Self {
        Self::new(1, Some(1))
    }

    /// `?`
    pub const fn optional() -> Self {
        Self::new(0, Some(1))
    }

    /// `*`
    pub const fn zero_or_more() -> Self {
        Self::new(0, None)
    }

    /// `+`
    pub const fn one_or_more() -> Self {
        Self::new(1, None)
    }

    /// Whether zero occurrences satisfy the bounds
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Whether the bounds have no maximum
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Whether exactly `count` occurrences satisfy the bounds
    pub fn admits(&self, count: u32) -> bool {
        count >= self.min && !self.max.is_some_and(|max| count > max)
    }

    /// Whether one more occurrence after `count` would exceed the maximum
    pub fn is_exhausted(&self, count: u32) -> bool {
        self.max.is_some_and(|max| count >= max)
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{{{},{}}}", self.min, max),
            None => write!(f, "{{{},unbounded}}", self.min),
        }
    }
}

/// Read `minOccurs`/`maxOccurs` attribute values; absent attributes default to 1
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let min = match min_occurs.map(str::trim) {
        None => 1,
        Some(text) => text.parse::<u32>().map_err(|_| {
            ParseError::new("minOccurs must be a non-negative integer").with_source(text)
        })?,
    };
    let max = match max_occurs.map(str::trim) {
        None => Some(1),
        Some("unbounded") => None,
        Some(text) => Some(text.parse::<u32>().map_err(|_| {
            ParseError::new("maxOccurs must be a non-negative integer or 'unbounded'")
                .with_source(text)
        })?),
    };

    let occurs = Occurs::new(min, max);
    if !occurs.is_unbounded() && !occurs.admits(min) {
        return Err(ParseError::new(format!("minOccurs is greater than maxOccurs in {}", occurs)).into());
    }
    Ok(occurs)
}

/// What a particle declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleKind {
    /// Element declaration
    Element(QName),
    /// Element wildcard (xs:any)
    Any(NamespaceConstraint),
    /// Model group
    Group(ModelType),
}

/// A schema particle as seen by the content-model engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Particle {
    /// Declared term
    pub kind: ParticleKind,
    /// Occurrence bounds
    pub occurs: Occurs,
}

impl Particle {
    /// Element declaration particle
    pub fn element(name: QName, occurs: Occurs) -> Self {
        Self {
            kind: ParticleKind::Element(name),
            occurs,
        }
    }

    /// Wildcard particle
    pub fn any(constraint: NamespaceConstraint, occurs: Occurs) -> Self {
        Self {
            kind: ParticleKind::Any(constraint),
            occurs,
        }
    }

    /// Model group particle
    pub fn group(model: ModelType, occurs: Occurs) -> Self {
        Self {
            kind: ParticleKind::Group(model),
            occurs,
        }
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParticleKind::Element(name) => write!(f, "element {}", name)?,
            ParticleKind::Any(constraint) => write!(f, "any[{}]", constraint)?,
            ParticleKind::Group(model) => write!(f, "{} group", model)?,
        }
        if self.occurs != Occurs::once() {
            write!(f, "{}", self.occurs)?;
        }
        Ok(())
    }
}

/// Shared handle to a particle whose equality is identity.
///
/// Two handles compare equal only if they were cloned from the same
/// [`ParticleRef::new`] call, regardless of the particle contents.
#[derive(Debug, Clone)]
pub struct ParticleRef(Arc<Particle>);

impl ParticleRef {
    /// Wrap a particle in a new identity
    pub fn new(particle: Particle) -> Self {
        Self(Arc::new(particle))
    }

    /// Access the particle
    pub fn particle(&self) -> &Particle {
        &self.0
    }
}

impl PartialEq for ParticleRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ParticleRef {}

impl fmt::Display for ParticleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

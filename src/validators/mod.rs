//! Content-model validators
//!
//! This module contains the content-model compiler and its runtime matchers.

// Schema components seen by the engine
pub mod particles;
pub mod wildcards;
pub mod groups;

// Compiler
pub mod symbols;
pub mod positions;
pub mod syntax;
pub mod builder;
pub mod automaton;
pub mod ranges;
pub mod upa;

// Runtime
pub mod models;

// Re-exports
pub use builder::{CompileOptions, ContentModelBuilder};
pub use groups::{AllGroupBuilder, ModelType};
pub use models::{ContentCategory, ContentValidator, Representation, RunState};
pub use particles::{parse_occurs, Occurs, Particle, ParticleKind, ParticleRef};
pub use symbols::{Symbol, SymbolTable};
pub use wildcards::NamespaceConstraint;

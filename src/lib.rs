//! # xmlcontent
//!
//! XML Schema content-model compiler and streaming child-element matchers.
//!
//! A complex type's content model (sequences, choices, wildcards and
//! occurrence bounds) is compiled once into an immutable
//! [`ContentValidator`]. Each element instance then gets its own
//! [`RunState`], advanced one child start tag at a time, with no
//! backtracking. Ambiguous models (violating Unique Particle Attribution)
//! are rejected at compile time.
//!
//! ## Features
//!
//! - Stack-based builder API for schema readers
//! - Deterministic transition tables with a bounded state budget
//! - Position-set matching when determinization is too large or not wanted
//! - Counter-based matching of general `minOccurs`/`maxOccurs` ranges
//! - xs:all groups, wildcards and open content
//! - Compact text notation for content models
//!
//! ## Example
//!
//! ```rust
//! use xmlcontent::namespaces::QName;
//! use xmlcontent::notation::compile_str;
//!
//! let validator = compile_str("(title, author{1,3}, any[##other]*)")?;
//! let mut run = validator.new_run();
//! validator.validate_element(&mut run, &QName::local("title"))?;
//! validator.validate_element(&mut run, &QName::local("author"))?;
//! assert!(validator.complete_validation(&run));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names
pub mod namespaces;
pub mod names;

// Content models
pub mod validators;
pub mod notation;

// Instance documents
pub mod documents;

// Re-exports for convenience
pub use error::{AmbiguityError, Error, MatchError, Result};
pub use limits::Limits;
pub use validators::{
    CompileOptions, ContentCategory, ContentModelBuilder, ContentValidator, RunState,
};

/// Version of the xmlcontent library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_1_0_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

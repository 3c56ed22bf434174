//! Error types for xmlcontent
//!
//! Content-model compilation can only fail for malformed schemas: the model
//! is ambiguous (it violates Unique Particle Attribution). Everything that
//! can go wrong while matching instance content is a [`MatchError`], which is
//! an ordinary return value the caller reports and recovers from.

use std::fmt;
use thiserror::Error;

use crate::validators::particles::ParticleRef;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlcontent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Content model violates Unique Particle Attribution
    #[error("ambiguous content model: {0}")]
    Ambiguity(#[from] AmbiguityError),

    /// Content-model notation parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML instance reading error
    #[error("XML error: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Two distinct particles compete for the same symbol from the same state.
#[derive(Debug, Clone)]
pub struct AmbiguityError {
    /// Display form of the contested symbol
    pub symbol: String,
    /// The particle reached first (lower position)
    pub first: ParticleRef,
    /// The competing particle
    pub second: ParticleRef,
}

impl AmbiguityError {
    /// Create a new ambiguity error
    pub fn new(symbol: impl Into<String>, first: ParticleRef, second: ParticleRef) -> Self {
        Self {
            symbol: symbol.into(),
            first,
            second,
        }
    }

    /// Check whether the error names the given particle on either side
    pub fn involves(&self, particle: &ParticleRef) -> bool {
        &self.first == particle || &self.second == particle
    }
}

impl fmt::Display for AmbiguityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' may be matched by both {} and {}",
            self.symbol, self.first, self.second
        )
    }
}

impl std::error::Error for AmbiguityError {}

/// Malformed notation or occurrence attribute.
///
/// When both the source text and an offset are known, the message is
/// followed by the source and a caret under the offending character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What is wrong
    pub message: String,
    /// Byte offset into `source`
    pub offset: Option<usize>,
    /// Text being parsed
    pub source: Option<String>,
}

impl ParseError {
    /// Error without position information
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
            source: None,
        }
    }

    /// Attach the byte offset of the error
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attach the text being parsed
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.offset) {
            (Some(source), Some(offset)) => {
                let column = source
                    .get(..offset)
                    .map_or(offset, |prefix| prefix.chars().count());
                write!(
                    f,
                    "{} at offset {}\n  {}\n  {}^",
                    self.message,
                    offset,
                    source,
                    " ".repeat(column)
                )
            }
            (Some(source), None) => write!(f, "{}: '{}'", self.message, source),
            (None, Some(offset)) => write!(f, "{} at offset {}", self.message, offset),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// Failure to match instance content against a compiled content model.
///
/// Returned by the runtime matchers; the run state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The element cannot appear here
    #[error("unexpected element '{name}'")]
    UnexpectedElement {
        /// Clark-notation name of the offending element
        name: String,
    },

    /// The element is declared by the model but has no transition from the
    /// current state
    #[error("element '{name}' is not allowed at this point of the content model")]
    IllFormed {
        /// Clark-notation name of the offending element
        name: String,
    },

    /// The end tag arrived before the content model was satisfied
    #[error("content is incomplete")]
    Incomplete,
}

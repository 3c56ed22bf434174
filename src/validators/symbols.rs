//! Content-model symbol table
//!
//! Every distinct child element name and every distinct wildcard namespace
//! constraint of one content model gets a small dense integer. Names and
//! wildcards never share a symbol, even when a wildcard would admit the
//! name; the automaton decides between them at match time.

use indexmap::IndexSet;
use std::fmt;

use crate::namespaces::QName;

use super::wildcards::NamespaceConstraint;

/// Dense symbol identifier within one content model.
///
/// Two negative values are reserved: [`Symbol::END_MARKER`] for the implicit
/// end-of-content leaf and [`Symbol::RANGE_TERMINAL`] for the leaf closing a
/// numeric occurrence range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(i32);

impl Symbol {
    /// Implicit end-of-content marker
    pub const END_MARKER: Symbol = Symbol(-1);

    /// Leaf closing a bounded occurrence range
    pub const RANGE_TERMINAL: Symbol = Symbol(-2);

    /// Index into the symbol table, `None` for the reserved symbols
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Raw integer value
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::END_MARKER => write!(f, "#end"),
            Self::RANGE_TERMINAL => write!(f, "#range"),
            Symbol(n) => write!(f, "#{}", n),
        }
    }
}

/// What a symbol stands for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    /// One specific element name
    Name(QName),
    /// One wildcard namespace constraint
    Wildcard(NamespaceConstraint),
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Wildcard(constraint) => write!(f, "any[{}]", constraint),
        }
    }
}

/// Symbol table of one content model
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    keys: IndexSet<SymbolKey>,
    /// Symbols of wildcard entries, in allocation order
    wildcards: Vec<Symbol>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbol for an element name, allocated on first use
    pub fn symbol_for(&mut self, name: &QName) -> Symbol {
        let (index, _) = self.keys.insert_full(SymbolKey::Name(name.clone()));
        Symbol(index as i32)
    }

    /// Symbol for a wildcard constraint, allocated on first use
    pub fn symbol_for_wildcard(&mut self, constraint: &NamespaceConstraint) -> Symbol {
        let (index, inserted) = self
            .keys
            .insert_full(SymbolKey::Wildcard(constraint.clone()));
        let symbol = Symbol(index as i32);
        if inserted {
            self.wildcards.push(symbol);
        }
        symbol
    }

    /// Total number of allocated symbols
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if no symbol was allocated
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// What a symbol stands for
    pub fn key(&self, symbol: Symbol) -> Option<&SymbolKey> {
        symbol.index().and_then(|i| self.keys.get_index(i))
    }

    /// Exact-name lookup, without considering wildcards
    pub fn lookup(&self, name: &QName) -> Option<Symbol> {
        // IndexSet lookups need an owned key of the same type
        self.keys
            .get_index_of(&SymbolKey::Name(name.clone()))
            .map(|i| Symbol(i as i32))
    }

    /// Candidate symbols for an incoming element, in matching priority:
    /// the exact name first, then every wildcard admitting it.
    pub fn candidates<'a>(&'a self, name: &'a QName) -> impl Iterator<Item = Symbol> + 'a {
        let wildcards = self.wildcards.iter().copied().filter(move |&symbol| {
            matches!(self.key(symbol), Some(SymbolKey::Wildcard(constraint)) if constraint.allows(name))
        });
        self.lookup(name).into_iter().chain(wildcards)
    }

    /// Display form of a symbol, used in diagnostics
    pub fn describe(&self, symbol: Symbol) -> String {
        match self.key(symbol) {
            Some(key) => key.to_string(),
            None => symbol.to_string(),
        }
    }
}

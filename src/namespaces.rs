//! XML namespace handling
//!
//! Child element names are compared as expanded names: a namespace URI plus
//! a local name. Prefixes only exist while reading documents and notation,
//! and are resolved here.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Expanded element name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI, `None` for names in no namespace
    pub namespace: Option<String>,
    /// Local part
    pub local_name: String,
}

impl QName {
    /// Name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Name in `namespace`
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Namespace URI, with "no namespace" as the empty string
    pub fn namespace_uri(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }
}

/// Clark notation: `{uri}local`, or just `local`
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// In-scope namespace declarations
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    bindings: HashMap<String, String>,
    default_namespace: Option<String>,
}

impl NamespaceContext {
    /// Context with no declarations
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `namespace`
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.bindings.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = (!namespace.is_empty()).then_some(namespace);
    }

    /// Apply an attribute if it is a namespace declaration (`xmlns` or
    /// `xmlns:p`). Returns whether it was one.
    pub fn declare(&mut self, attribute: &str, value: &str) -> bool {
        match attribute.strip_prefix("xmlns") {
            Some("") => self.set_default_namespace(value),
            Some(rest) => match rest.strip_prefix(':') {
                Some(prefix) => self.add_prefix(prefix, value),
                None => return false,
            },
            None => return false,
        }
        true
    }

    /// Namespace bound to `prefix`
    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Namespace of unprefixed element names
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Expand a lexical `prefix:local` or `local` element name
    pub fn resolve(&self, lexical: &str) -> Result<QName> {
        let (namespace, local) = match lexical.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self
                    .namespace_for(prefix)
                    .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
                (Some(namespace), local)
            }
            None => (self.default_namespace(), lexical),
        };
        Ok(QName {
            namespace: namespace.map(String::from),
            local_name: local.to_string(),
        })
    }
}

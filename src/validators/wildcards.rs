//! XSD element wildcard namespace constraints
//!
//! An `xs:any` particle matches children by namespace only. Each distinct
//! constraint becomes one wildcard symbol of a content model; the constraint
//! is consulted while matching whenever the current state can accept a
//! wildcard.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Wildcards

use crate::error::ParseError;
use crate::namespaces::QName;
use std::collections::BTreeSet;
use std::fmt;

/// Namespace constraint for wildcards
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except target namespace and no namespace (##other)
    Other {
        /// The target namespace to exclude
        target_namespace: Option<String>,
    },
    /// Specific set of allowed namespaces; "" stands for no namespace
    Enumeration(BTreeSet<String>),
    /// XSD 1.1: Set of disallowed namespaces (notNamespace)
    Not(BTreeSet<String>),
}

impl NamespaceConstraint {
    /// Create from namespace attribute value
    pub fn from_namespace_attr(
        value: &str,
        target_namespace: Option<&str>,
    ) -> Result<Self, ParseError> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace.map(String::from),
            }),
            other => Ok(Self::Enumeration(parse_namespace_list(
                other,
                target_namespace,
                "namespace",
            )?)),
        }
    }

    /// Create from notNamespace attribute (XSD 1.1)
    pub fn from_not_namespace_attr(
        value: &str,
        target_namespace: Option<&str>,
    ) -> Result<Self, ParseError> {
        Ok(Self::Not(parse_namespace_list(
            value.trim(),
            target_namespace,
            "notNamespace",
        )?))
    }

    /// Single-namespace enumeration
    pub fn namespace(uri: impl Into<String>) -> Self {
        Self::Enumeration(BTreeSet::from([uri.into()]))
    }

    /// Check if a namespace is allowed by this constraint ("" = no namespace)
    pub fn is_allowed(&self, namespace: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => {
                !namespace.is_empty() && target_namespace.as_deref() != Some(namespace)
            }
            Self::Enumeration(set) => set.contains(namespace),
            Self::Not(set) => !set.contains(namespace),
        }
    }

    /// Check whether an element name satisfies the constraint.
    ///
    /// Only the namespace takes part; the local name is never inspected.
    pub fn allows(&self, name: &QName) -> bool {
        self.is_allowed(name.namespace_uri())
    }
}

fn parse_namespace_list(
    value: &str,
    target_namespace: Option<&str>,
    attribute: &str,
) -> Result<BTreeSet<String>, ParseError> {
    let mut namespaces = BTreeSet::new();
    for ns in value.split_whitespace() {
        match ns {
            "##local" => {
                namespaces.insert(String::new());
            }
            "##targetNamespace" => {
                namespaces.insert(target_namespace.unwrap_or_default().to_string());
            }
            s if s.starts_with("##") => {
                return Err(ParseError::new(format!(
                    "wrong value '{}' in '{}' attribute",
                    s, attribute
                )));
            }
            uri => {
                namespaces.insert(uri.to_string());
            }
        }
    }
    Ok(namespaces)
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_list(f: &mut fmt::Formatter<'_>, set: &BTreeSet<String>) -> fmt::Result {
            let mut first = true;
            for ns in set {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                if ns.is_empty() {
                    write!(f, "##local")?;
                } else {
                    write!(f, "{}", ns)?;
                }
            }
            Ok(())
        }

        match self {
            Self::Any => write!(f, "##any"),
            Self::Other { .. } => write!(f, "##other"),
            Self::Enumeration(set) => write_list(f, set),
            Self::Not(set) => {
                write!(f, "not ")?;
                write_list(f, set)
            }
        }
    }
}

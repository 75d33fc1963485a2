//! Assertion data structure
//!
//! A single (subject, predicate, object) fact. Terms are either resources
//! (identified by URI) or literal strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RDF syntax namespace
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// `rdf:type`
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Container classes recognized by [`GraphStore::is_container`](super::GraphStore::is_container)
pub const RDF_CONTAINERS: [&str; 3] = [
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#Seq",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#Alt",
];

/// Build the `rdf:_n` membership predicate for a 1-based ordinal
pub fn ordinal_predicate(n: usize) -> String {
    format!("{}_{}", RDF_NS, n)
}

/// Parse the ordinal out of an `rdf:_n` membership predicate
pub fn ordinal_index(predicate: &str) -> Option<usize> {
    let n: usize = predicate.strip_prefix(RDF_NS)?.strip_prefix('_')?.parse().ok()?;
    (n > 0).then_some(n)
}

/// A node or value in an assertion
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    /// A resource named by URI
    Resource(String),

    /// A literal string value
    Literal(String),
}

impl Term {
    /// Create a resource term
    pub fn resource(uri: impl Into<String>) -> Self {
        Self::Resource(uri.into())
    }

    /// Create a literal term
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// The URI if this is a resource
    pub fn as_resource(&self) -> Option<&str> {
        match self {
            Self::Resource(uri) => Some(uri),
            Self::Literal(_) => None,
        }
    }

    /// The value if this is a literal
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Resource(_) => None,
        }
    }
}

/// Write an IRI in angle brackets, `\u`-escaping characters N-Triples forbids there
fn write_iri(f: &mut fmt::Formatter<'_>, iri: &str) -> fmt::Result {
    f.write_str("<")?;
    for c in iri.chars() {
        match c {
            '\u{0}'..='\u{20}' | '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                write!(f, "\\u{:04X}", c as u32)?
            }
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str(">")
}

impl fmt::Display for Term {
    /// Formats the term in N-Triples notation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(uri) => write_iri(f, uri),
            Self::Literal(value) => {
                f.write_str("\"")?;
                for c in value.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

/// A (subject, predicate, object) fact
///
/// Subjects and predicates are always resources, so they are stored as plain
/// URIs; only the object can be a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assertion {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Assertion {
    /// Create a new assertion
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Assertion {
    /// Formats the assertion as one N-Triples line (without newline)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_iri(f, &self.subject)?;
        f.write_str(" ")?;
        write_iri(f, &self.predicate)?;
        write!(f, " {} .", self.object)
    }
}

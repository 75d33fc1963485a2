//! In-memory assertion store for a single data source

use super::assertion::{ordinal_index, Assertion, Term, RDF_CONTAINERS, RDF_TYPE};
use super::SourceLocation;
use crate::error::LoadError;
use crate::rdf::{self, SourceFormat};
use std::collections::BTreeSet;

/// The assertions loaded from one location
///
/// Assertions are kept in a set, so inserting the same fact twice is a no-op.
/// Iteration order is deterministic (sorted), which keeps lookups stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStore {
    location: SourceLocation,
    assertions: BTreeSet<Assertion>,
}

impl GraphStore {
    /// Create an empty store for a location
    pub fn new(location: impl Into<SourceLocation>) -> Self {
        Self {
            location: location.into(),
            assertions: BTreeSet::new(),
        }
    }

    /// Parse a document into a new store
    pub fn parse(
        location: impl Into<SourceLocation>,
        body: &str,
        format: SourceFormat,
    ) -> Result<Self, LoadError> {
        let mut store = Self::new(location);
        let assertions = match format {
            SourceFormat::RdfXml => rdf::parse_rdf_xml(store.location.as_str(), body)?,
            SourceFormat::NTriples => rdf::parse_ntriples(store.location.as_str(), body)?,
        };
        store.extend(assertions);
        Ok(store)
    }

    /// Location this store was loaded from
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Insert an assertion, returning false if it was already present
    pub fn insert(&mut self, assertion: Assertion) -> bool {
        self.assertions.insert(assertion)
    }

    /// Insert many assertions
    pub fn extend(&mut self, assertions: impl IntoIterator<Item = Assertion>) {
        self.assertions.extend(assertions);
    }

    /// Whether the store holds an assertion
    pub fn contains(&self, assertion: &Assertion) -> bool {
        self.assertions.contains(assertion)
    }

    /// Number of assertions
    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }

    /// Iterate all assertions in sorted order
    pub fn assertions(&self) -> impl Iterator<Item = &Assertion> {
        self.assertions.iter()
    }

    /// Iterate assertions with the given subject
    pub fn about<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a Assertion> + 'a {
        self.assertions.iter().filter(move |a| a.subject == subject)
    }

    /// First object for a subject/predicate pair
    pub fn lookup<'a>(&'a self, subject: &'a str, predicate: &str) -> Option<&'a Term> {
        self.about(subject)
            .find(|a| a.predicate == predicate)
            .map(|a| &a.object)
    }

    /// First literal object for a subject/predicate pair
    ///
    /// Resource objects are skipped.
    pub fn lookup_literal<'a>(&'a self, subject: &'a str, predicate: &str) -> Option<&'a str> {
        self.about(subject)
            .filter(|a| a.predicate == predicate)
            .find_map(|a| a.object.as_literal())
    }

    /// Whether a resource is declared as a container or has members
    pub fn is_container(&self, subject: &str) -> bool {
        self.about(subject).any(|a| {
            ordinal_index(&a.predicate).is_some()
                || (a.predicate == RDF_TYPE
                    && a.object
                        .as_resource()
                        .is_some_and(|class| RDF_CONTAINERS.contains(&class)))
        })
    }

    /// Members of a container in ordinal order
    ///
    /// Gaps in the numbering are skipped. When an ordinal carries more than one
    /// member all of them are returned in sorted order.
    pub fn container_members<'a>(&'a self, container: &'a str) -> Vec<&'a Term> {
        let mut members: Vec<(usize, &'a Term)> = self
            .about(container)
            .filter_map(|a| ordinal_index(&a.predicate).map(|n| (n, &a.object)))
            .collect();
        members.sort_by_key(|(n, _)| *n);
        members.into_iter().map(|(_, term)| term).collect()
    }
}

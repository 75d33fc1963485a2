//! Core graph data structures
//!
//! Defines Assertion, GraphStore, and the CompositeView that unions them.

mod assertion;
mod composite;
mod ids;
mod store;

pub use assertion::{
    ordinal_index, ordinal_predicate, Assertion, Term, RDF_CONTAINERS, RDF_NS, RDF_TYPE,
};
pub use composite::{CompositeView, GraphSnapshot, MergeOutcome};
pub use ids::SourceLocation;
pub use store::GraphStore;

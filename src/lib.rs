//! graphfed - Federated aggregation of graph data sources
//!
//! A bootstrap registry names a set of graph data sources. graphfed loads the
//! registry, loads every source it declares concurrently, merges them into one
//! queryable composite view, and keeps sources that declare a poll interval
//! fresh on independent timers. A source that fails is logged and skipped; the
//! rest of the federation carries on without it.
//!
//! # Architecture
//!
//! - **graph**: Assertions, per-source stores, and the composite view
//! - **rdf**: RDF/XML and N-Triples parsing
//! - **fetch**: Location access (http, https, file, in-memory)
//! - **registry**: Bootstrap registry enumeration and the store cache
//! - **loader**: Per-source loading with failure isolation
//! - **scheduler**: Periodic refresh timers
//! - **session**: Lifecycle, ownership, and event broadcast
//! - **config**: YAML configuration
//!
//! # Example
//!
//! ```no_run
//! use graphfed::session::FederationSessionBuilder;
//!
//! # async fn example() -> graphfed::Result<()> {
//! let session = FederationSessionBuilder::new("file:///etc/graphfed/registry.rdf").build()?;
//! session.start().await?;
//! session.wait_for_initial_loads().await;
//!
//! for assertion in &session.composite().current_graph().assertions {
//!     println!("{}", assertion);
//! }
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod graph;
pub mod rdf;

// Components
pub mod events;
pub mod fetch;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod session;

// Re-exports
pub use error::{GraphFedError, LoadError, Result};

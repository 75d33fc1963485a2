//! Source loading
//!
//! Fetches each declared source, parses it into its own store, and merges it
//! into the shared composite view.

mod source_loader;

pub use source_loader::{SourceLoader, SourceState, SourceStatus};

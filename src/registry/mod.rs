//! Source registry
//!
//! The bootstrap registry is itself graph data: a container resource whose
//! ordered members are the locations to load, each optionally annotated with a
//! poll interval. The registry is loaded once, completely, before any source
//! is fetched.

mod cache;
mod source_registry;

pub use cache::StoreCache;
pub use source_registry::{parse_poll_interval, RegistryOptions, SourceDescriptor, SourceRegistry};

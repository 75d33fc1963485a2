//! Federation session
//!
//! A [`FederationSession`] owns every moving part of one federation: the
//! fetcher, the store cache, the composite view, the loader, the refresh
//! scheduler and the event bus. It loads the registry, fans out the initial
//! loads, and tears everything down on shutdown.

mod daemon;

pub use daemon::{FederationSession, FederationSessionBuilder, SessionStats};

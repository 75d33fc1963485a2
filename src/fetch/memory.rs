//! In-memory fetcher

use super::{FetchedDocument, SourceFetcher};
use crate::error::LoadError;
use crate::graph::SourceLocation;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct Entries {
    documents: HashMap<SourceLocation, Result<FetchedDocument, LoadError>>,
    delays: HashMap<SourceLocation, Duration>,
    fetches: HashMap<SourceLocation, usize>,
}

/// Serves documents from a location → content map
///
/// Content can be swapped at any time, which is how reloads observe new data.
/// Unknown locations fail with `LoadError::Network`.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: Mutex<Entries>,
}

impl MemoryFetcher {
    /// Create an empty fetcher
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve a document at a location
    pub fn insert(&self, location: impl Into<SourceLocation>, document: FetchedDocument) {
        self.entries()
            .documents
            .insert(location.into(), Ok(document));
    }

    /// Serve RDF/XML text at a location
    pub fn insert_rdf_xml(&self, location: impl Into<SourceLocation>, body: impl Into<String>) {
        self.insert(
            location,
            FetchedDocument::new(body).with_content_type("application/rdf+xml"),
        );
    }

    /// Serve N-Triples text at a location
    pub fn insert_ntriples(&self, location: impl Into<SourceLocation>, body: impl Into<String>) {
        self.insert(
            location,
            FetchedDocument::new(body).with_content_type("application/n-triples"),
        );
    }

    /// Make every fetch of a location fail
    pub fn fail(&self, location: impl Into<SourceLocation>, error: LoadError) {
        self.entries().documents.insert(location.into(), Err(error));
    }

    /// Delay every fetch of a location
    pub fn set_delay(&self, location: impl Into<SourceLocation>, delay: Duration) {
        self.entries().delays.insert(location.into(), delay);
    }

    /// How many times a location has been fetched
    pub fn fetch_count(&self, location: &SourceLocation) -> usize {
        self.entries().fetches.get(location).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SourceFetcher for MemoryFetcher {
    async fn fetch(&self, location: &SourceLocation) -> Result<FetchedDocument, LoadError> {
        let delay = {
            let mut entries = self.entries();
            *entries.fetches.entry(location.clone()).or_insert(0) += 1;
            entries.delays.get(location).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.entries()
            .documents
            .get(location)
            .cloned()
            .unwrap_or_else(|| Err(LoadError::Network(format!("no route to {}", location))))
    }
}

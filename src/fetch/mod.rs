//! Location access
//!
//! A [`SourceFetcher`] turns a location into document text. The registry and
//! the loader receive one by injection; [`LocationFetcher`] handles `http`,
//! `https`, `file` and bare paths, and [`MemoryFetcher`] serves documents held
//! in memory.

mod location;
mod memory;

pub use location::LocationFetcher;
pub use memory::MemoryFetcher;

use crate::error::LoadError;
use crate::graph::SourceLocation;
use crate::rdf::SourceFormat;
use async_trait::async_trait;

/// Raw document fetched from a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Document text
    pub body: String,

    /// Content type reported by the transport, if any
    pub content_type: Option<String>,
}

impl FetchedDocument {
    /// Create a document without a content type
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Format of this document, given where it came from
    pub fn format(&self, location: &SourceLocation) -> SourceFormat {
        SourceFormat::detect(location, self.content_type.as_deref())
    }
}

/// Fetches documents by location
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the current content at a location
    async fn fetch(&self, location: &SourceLocation) -> Result<FetchedDocument, LoadError>;
}

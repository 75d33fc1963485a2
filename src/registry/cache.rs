//! Store cache
//!
//! One parsed store per location for the life of a session. A location that has
//! already been loaded is handed out again instead of being fetched twice.

use crate::graph::{GraphStore, SourceLocation};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Location → loaded store map shared by the registry and the loader
#[derive(Debug, Default)]
pub struct StoreCache {
    stores: Mutex<HashMap<SourceLocation, Arc<GraphStore>>>,
}

impl StoreCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn stores(&self) -> MutexGuard<'_, HashMap<SourceLocation, Arc<GraphStore>>> {
        self.stores.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached store for a location
    pub fn get(&self, location: &SourceLocation) -> Option<Arc<GraphStore>> {
        let store = self.stores().get(location).cloned();
        if store.is_some() {
            crate::metrics::record_cache_hit();
        } else {
            crate::metrics::record_cache_miss();
        }
        store
    }

    /// Cache a store, returning the one it replaced
    pub fn insert(&self, store: Arc<GraphStore>) -> Option<Arc<GraphStore>> {
        self.stores().insert(store.location().clone(), store)
    }

    /// Whether a location has been loaded
    pub fn contains(&self, location: &SourceLocation) -> bool {
        self.stores().contains_key(location)
    }

    /// Number of cached stores
    pub fn len(&self) -> usize {
        self.stores().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.stores().is_empty()
    }
}

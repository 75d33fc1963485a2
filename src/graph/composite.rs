//! Composite view
//!
//! The union of every successfully loaded source, presented as one logical graph.
//! Each location contributes exactly one store; merging a location again replaces
//! its previous contribution, so reloads retire stale assertions.

use super::{Assertion, GraphStore, SourceLocation, Term};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What a merge did to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First contribution from this location
    Added,

    /// Replaced an earlier contribution from this location
    Replaced,
}

#[derive(Debug, Default)]
struct Constituents {
    /// Locations in first-merge order
    order: Vec<SourceLocation>,
    stores: HashMap<SourceLocation, Arc<GraphStore>>,
    /// How many constituents hold each assertion
    counts: HashMap<Assertion, usize>,
    /// Bumped on every merge
    generation: u64,
}

impl Constituents {
    fn count_in(&mut self, store: &GraphStore) {
        for assertion in store.assertions() {
            *self.counts.entry(assertion.clone()).or_insert(0) += 1;
        }
    }

    fn count_out(&mut self, store: &GraphStore) {
        for assertion in store.assertions() {
            if let Some(count) = self.counts.get_mut(assertion) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(assertion);
                }
            }
        }
    }
}

/// Shared union graph over all loaded sources
///
/// Writers are serialized by an internal lock; readers may observe the graph
/// growing between two reads.
#[derive(Debug, Default)]
pub struct CompositeView {
    inner: RwLock<Constituents>,
}

/// Point-in-time copy of the composite graph
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// Deduplicated union of all contributions
    pub assertions: BTreeSet<Assertion>,

    /// Contributing locations, in first-merge order
    pub sources: Vec<SourceLocation>,

    /// View generation the snapshot was taken at
    pub generation: u64,
}

impl GraphSnapshot {
    /// Number of distinct assertions
    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }
}

impl CompositeView {
    /// Create an empty view
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: a merge only panics on allocation failure.
    fn read(&self) -> RwLockReadGuard<'_, Constituents> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Constituents> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Merge a location's store into the view
    ///
    /// Replaces whatever that location contributed before and leaves other
    /// locations untouched.
    pub fn merge(&self, location: SourceLocation, store: Arc<GraphStore>) -> MergeOutcome {
        let mut inner = self.write();
        inner.generation += 1;
        inner.count_in(&store);

        let outcome = match inner.stores.insert(location.clone(), store) {
            Some(previous) => {
                inner.count_out(&previous);
                MergeOutcome::Replaced
            }
            None => {
                inner.order.push(location.clone());
                MergeOutcome::Added
            }
        };

        tracing::debug!(
            location = %location,
            outcome = ?outcome,
            generation = inner.generation,
            "Merged source into composite view"
        );

        outcome
    }

    /// Snapshot the current union graph
    pub fn current_graph(&self) -> GraphSnapshot {
        let inner = self.read();
        let assertions = inner
            .order
            .iter()
            .filter_map(|loc| inner.stores.get(loc))
            .flat_map(|store| store.assertions().cloned())
            .collect();

        GraphSnapshot {
            assertions,
            sources: inner.order.clone(),
            generation: inner.generation,
        }
    }

    /// Whether any constituent holds the assertion
    pub fn contains(&self, assertion: &Assertion) -> bool {
        self.read().stores.values().any(|s| s.contains(assertion))
    }

    /// First object for a subject/predicate pair, searching constituents in merge order
    pub fn lookup(&self, subject: &str, predicate: &str) -> Option<Term> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|loc| inner.stores.get(loc))
            .find_map(|store| store.lookup(subject, predicate).cloned())
    }

    /// The store currently contributed by a location
    pub fn contribution(&self, location: &SourceLocation) -> Option<Arc<GraphStore>> {
        self.read().stores.get(location).cloned()
    }

    /// Contributing locations, in first-merge order
    pub fn sources(&self) -> Vec<SourceLocation> {
        self.read().order.clone()
    }

    /// Number of distinct assertions across all constituents
    pub fn len(&self) -> usize {
        self.read().counts.len()
    }

    /// Whether no assertions have been merged
    pub fn is_empty(&self) -> bool {
        self.read().counts.is_empty()
    }

    /// Current generation (number of merges so far)
    pub fn generation(&self) -> u64 {
        self.read().generation
    }
}

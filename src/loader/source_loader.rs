//! Per-source loading into the composite view

use crate::error::LoadError;
use crate::events::{EventBus, FederationEvent, LoadKind};
use crate::fetch::SourceFetcher;
use crate::graph::{CompositeView, GraphStore, SourceLocation};
use crate::metrics;
use crate::registry::{SourceDescriptor, StoreCache};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;

/// Where a source stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Merged into the composite view at least once
    Active,

    /// Never loaded successfully
    Failed,
}

/// Load history of one source
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub location: SourceLocation,
    pub state: SourceState,

    /// Time of the latest successful load
    pub loaded_at: Option<DateTime<Utc>>,

    /// Time of the latest attempt, successful or not
    pub last_attempt: DateTime<Utc>,

    /// Assertions in the current contribution
    pub assertions: usize,

    /// Successful reloads after the first load
    pub reloads: u64,

    /// Error from the latest attempt, cleared on success
    pub last_error: Option<LoadError>,
}

/// Fetch ordering for one location
///
/// Every fetch takes the next ticket. A fetched store is merged only if no
/// later ticket has been merged already.
#[derive(Debug, Default, Clone, Copy)]
struct Sequence {
    issued: u64,
    merged: u64,
}

/// Loads sources and merges them into the composite view
///
/// Failures stay with the source that caused them: they are logged, broadcast
/// as `SourceFailed`, and returned to the caller, but never touch other sources.
///
/// Initial loads of one location run one at a time, so duplicate registry
/// entries fetch once. A fetch that completes after a newer fetch of the same
/// location has been merged is discarded.
pub struct SourceLoader {
    fetcher: Arc<dyn SourceFetcher>,
    cache: Arc<StoreCache>,
    composite: Arc<CompositeView>,
    events: EventBus,
    statuses: Mutex<HashMap<SourceLocation, SourceStatus>>,
    flights: Mutex<HashMap<SourceLocation, Arc<AsyncMutex<()>>>>,
    sequences: Mutex<HashMap<SourceLocation, Sequence>>,
}

impl SourceLoader {
    /// Create a loader
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        cache: Arc<StoreCache>,
        composite: Arc<CompositeView>,
        events: EventBus,
    ) -> Self {
        Self {
            fetcher,
            cache,
            composite,
            events,
            statuses: Mutex::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            sequences: Mutex::new(HashMap::new()),
        }
    }

    fn statuses_mut(&self) -> MutexGuard<'_, HashMap<SourceLocation, SourceStatus>> {
        self.statuses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sequences_mut(&self) -> MutexGuard<'_, HashMap<SourceLocation, Sequence>> {
        self.sequences.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flight(&self, location: &SourceLocation) -> Arc<AsyncMutex<()>> {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(flights.entry(location.clone()).or_default())
    }

    fn ticket(&self, location: &SourceLocation) -> u64 {
        let mut sequences = self.sequences_mut();
        let sequence = sequences.entry(location.clone()).or_default();
        sequence.issued += 1;
        sequence.issued
    }

    fn announce(&self, location: &SourceLocation, kind: LoadKind) {
        self.events.send(FederationEvent::LoadStarted {
            location: location.clone(),
            kind,
        });
    }

    /// Load a declared source and merge it
    ///
    /// A location already in the store cache is merged from the cache without
    /// fetching again. Returns the number of assertions contributed.
    pub async fn load(&self, descriptor: &SourceDescriptor) -> Result<usize, LoadError> {
        self.announce(&descriptor.location, LoadKind::Initial);
        self.load_announced(descriptor).await
    }

    /// Announce an initial load now and return the load itself
    ///
    /// `LoadStarted` is broadcast before this returns, so callers that spawn
    /// the returned future still announce loads in the order they begin them.
    pub fn begin_load(
        self: &Arc<Self>,
        descriptor: SourceDescriptor,
    ) -> impl Future<Output = Result<usize, LoadError>> + Send + 'static {
        self.announce(&descriptor.location, LoadKind::Initial);
        let loader = Arc::clone(self);
        async move { loader.load_announced(&descriptor).await }
    }

    async fn load_announced(&self, descriptor: &SourceDescriptor) -> Result<usize, LoadError> {
        let location = &descriptor.location;
        let started = Instant::now();

        let flight = self.flight(location);
        let _guard = flight.lock().await;

        if let Some(store) = self.cache.get(location) {
            tracing::debug!(location = %location, "Using cached store");
            let assertions = self.merge_cached(location, store);
            return Ok(self.report_success(location, LoadKind::Initial, started, assertions));
        }

        let ticket = self.ticket(location);
        let result = self.fetch_store(location).await;
        self.finish(location, LoadKind::Initial, started, ticket, result)
    }

    /// Fetch a source again and replace its contribution
    ///
    /// On failure the previous contribution stays in the view.
    pub async fn reload(&self, location: &SourceLocation) -> Result<usize, LoadError> {
        let started = Instant::now();
        self.announce(location, LoadKind::Reload);

        let ticket = self.ticket(location);
        let result = self.fetch_store(location).await;
        self.finish(location, LoadKind::Reload, started, ticket, result)
    }

    async fn fetch_store(&self, location: &SourceLocation) -> Result<Arc<GraphStore>, LoadError> {
        let document = self.fetcher.fetch(location).await?;
        let format = document.format(location);
        let store = GraphStore::parse(location.clone(), &document.body, format)?;
        Ok(Arc::new(store))
    }

    /// Merge a cached store unless the location already contributes
    fn merge_cached(&self, location: &SourceLocation, store: Arc<GraphStore>) -> usize {
        let _sequences = self.sequences_mut();
        match self.composite.contribution(location) {
            Some(current) => current.len(),
            None => {
                let assertions = store.len();
                self.composite.merge(location.clone(), store);
                assertions
            }
        }
    }

    /// Merge a fetched store if it is the newest one seen for its location
    ///
    /// Returns the size of the contribution left in the view.
    fn accept(&self, location: &SourceLocation, ticket: u64, store: Arc<GraphStore>) -> usize {
        let mut sequences = self.sequences_mut();
        let sequence = sequences.entry(location.clone()).or_default();

        if ticket < sequence.merged {
            tracing::debug!(
                location = %location,
                ticket,
                merged = sequence.merged,
                "Discarding load overtaken by a newer fetch"
            );
            return self
                .composite
                .contribution(location)
                .map_or(0, |current| current.len());
        }

        sequence.merged = ticket;
        let assertions = store.len();
        self.cache.insert(Arc::clone(&store));
        self.composite.merge(location.clone(), store);
        assertions
    }

    fn finish(
        &self,
        location: &SourceLocation,
        kind: LoadKind,
        started: Instant,
        ticket: u64,
        result: Result<Arc<GraphStore>, LoadError>,
    ) -> Result<usize, LoadError> {
        match result {
            Ok(store) => {
                let assertions = self.accept(location, ticket, store);
                Ok(self.report_success(location, kind, started, assertions))
            }
            Err(error) => {
                self.record_failure(location, &error);

                metrics::record_load(kind.as_str(), false, started.elapsed().as_secs_f64());
                tracing::warn!(
                    location = %location,
                    kind = %kind,
                    error = %error,
                    "Source failed to load"
                );

                self.events.send(FederationEvent::SourceFailed {
                    location: location.clone(),
                    error: error.clone(),
                    kind,
                });
                Err(error)
            }
        }
    }

    fn report_success(
        &self,
        location: &SourceLocation,
        kind: LoadKind,
        started: Instant,
        assertions: usize,
    ) -> usize {
        self.record_success(location, kind, assertions);

        metrics::record_load(kind.as_str(), true, started.elapsed().as_secs_f64());
        metrics::set_composite_assertions(self.composite.len());
        tracing::info!(
            location = %location,
            kind = %kind,
            assertions,
            "Source loaded"
        );

        self.events.send(FederationEvent::SourceLoaded {
            location: location.clone(),
            assertions,
            kind,
        });
        assertions
    }

    fn record_success(&self, location: &SourceLocation, kind: LoadKind, assertions: usize) {
        let now = Utc::now();
        let mut statuses = self.statuses_mut();
        let status = statuses
            .entry(location.clone())
            .or_insert_with(|| SourceStatus {
                location: location.clone(),
                state: SourceState::Active,
                loaded_at: None,
                last_attempt: now,
                assertions: 0,
                reloads: 0,
                last_error: None,
            });

        if kind == LoadKind::Reload && status.state == SourceState::Active {
            status.reloads += 1;
        }
        status.state = SourceState::Active;
        status.loaded_at = Some(now);
        status.last_attempt = now;
        status.assertions = assertions;
        status.last_error = None;
    }

    fn record_failure(&self, location: &SourceLocation, error: &LoadError) {
        let now = Utc::now();
        let mut statuses = self.statuses_mut();
        let status = statuses
            .entry(location.clone())
            .or_insert_with(|| SourceStatus {
                location: location.clone(),
                state: SourceState::Failed,
                loaded_at: None,
                last_attempt: now,
                assertions: 0,
                reloads: 0,
                last_error: None,
            });

        status.last_attempt = now;
        status.last_error = Some(error.clone());
    }

    /// Status of one source
    pub fn status(&self, location: &SourceLocation) -> Option<SourceStatus> {
        self.statuses_mut().get(location).cloned()
    }

    /// Status of every source attempted so far, sorted by location
    pub fn statuses(&self) -> Vec<SourceStatus> {
        let mut statuses: Vec<_> = self.statuses_mut().values().cloned().collect();
        statuses.sort_by(|a, b| a.location.cmp(&b.location));
        statuses
    }

    /// Whether a source has been merged at least once
    pub fn is_active(&self, location: &SourceLocation) -> bool {
        self.statuses_mut()
            .get(location)
            .is_some_and(|s| s.state == SourceState::Active)
    }

    /// Number of active sources
    pub fn active_count(&self) -> usize {
        self.statuses_mut()
            .values()
            .filter(|s| s.state == SourceState::Active)
            .count()
    }

    /// The composite view this loader feeds
    pub fn composite(&self) -> &Arc<CompositeView> {
        &self.composite
    }
}

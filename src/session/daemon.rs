//! Session lifecycle

use crate::config::FederationConfig;
use crate::error::LoadError;
use crate::events::{EventBus, FederationEvent};
use crate::fetch::{LocationFetcher, SourceFetcher};
use crate::graph::{CompositeView, SourceLocation};
use crate::loader::{SourceLoader, SourceState};
use crate::registry::{RegistryOptions, SourceDescriptor, SourceRegistry, StoreCache};
use crate::scheduler::RefreshScheduler;
use crate::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// One running federation
///
/// The registry is loaded to completion before any source is touched. Each
/// declared source then loads on its own task; a source that loads and
/// declares a poll interval is handed to the refresh scheduler.
pub struct FederationSession {
    /// Configuration
    config: FederationConfig,

    /// Location access shared by the registry and the loader
    fetcher: Arc<dyn SourceFetcher>,

    /// Stores already parsed in this session
    cache: Arc<StoreCache>,

    /// Merged view of every loaded source
    composite: Arc<CompositeView>,

    loader: Arc<SourceLoader>,
    scheduler: Arc<RefreshScheduler>,

    /// Event bus
    events: EventBus,

    /// Sources declared by the registry, in order
    declared: Mutex<Vec<SourceDescriptor>>,

    /// Initial loads not yet awaited
    loads: Mutex<Vec<JoinHandle<()>>>,

    /// Running flag
    running: AtomicBool,
}

impl FederationSession {
    /// Create a session that fetches through `fetcher`
    pub fn new(config: FederationConfig, fetcher: Arc<dyn SourceFetcher>) -> Self {
        let events = EventBus::new(config.event_channel_capacity);
        let cache = Arc::new(StoreCache::new());
        let composite = Arc::new(CompositeView::new());
        let loader = Arc::new(SourceLoader::new(
            Arc::clone(&fetcher),
            Arc::clone(&cache),
            Arc::clone(&composite),
            events.clone(),
        ));
        let scheduler = Arc::new(RefreshScheduler::new(Arc::clone(&loader), events.clone()));

        Self {
            config,
            fetcher,
            cache,
            composite,
            loader,
            scheduler,
            events,
            declared: Mutex::new(Vec::new()),
            loads: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Create a session that fetches network and filesystem locations
    pub fn from_config(config: FederationConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = LocationFetcher::new(&config.fetch)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    fn loads(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.loads.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn declared_mut(&self) -> MutexGuard<'_, Vec<SourceDescriptor>> {
        self.declared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get an event subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<FederationEvent> {
        self.events.subscribe()
    }

    /// Configuration in use
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// The merged view of all loaded sources
    pub fn composite(&self) -> &Arc<CompositeView> {
        &self.composite
    }

    /// The loader, for per-source status
    pub fn loader(&self) -> &Arc<SourceLoader> {
        &self.loader
    }

    /// The refresh scheduler
    pub fn scheduler(&self) -> &Arc<RefreshScheduler> {
        &self.scheduler
    }

    /// Sources declared by the registry, in declaration order
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        self.declared_mut().clone()
    }

    /// Check if the session has started and not shut down
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Load the registry only
    pub async fn load_registry(&self) -> Result<SourceRegistry> {
        let bootstrap = self.config.registry_location();
        SourceRegistry::load(
            self.fetcher.as_ref(),
            &self.cache,
            RegistryOptions::from(&self.config),
            &bootstrap,
        )
        .await
    }

    /// Load the registry and initiate one load per declared source
    ///
    /// Returns once every load has been initiated, in declaration order; the
    /// loads themselves complete in the background. If the registry cannot be
    /// loaded nothing else happens and the composite view stays empty.
    pub async fn start(&self) -> Result<Vec<SourceDescriptor>> {
        let registry = match self.load_registry().await {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!(error = %e, "Federation cannot start");
                return Err(e);
            }
        };

        let descriptors = registry.enumerate();
        *self.declared_mut() = descriptors.clone();
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(
            registry = %registry.location(),
            sources = descriptors.len(),
            "Registry loaded"
        );
        self.events.send(FederationEvent::RegistryLoaded {
            location: registry.location().clone(),
            sources: descriptors.len(),
        });

        let mut loads = self.loads();
        for descriptor in &descriptors {
            let load = self.loader.begin_load(descriptor.clone());
            loads.push(tokio::spawn(initial_load(
                load,
                Arc::clone(&self.scheduler),
                descriptor.clone(),
            )));
        }

        Ok(descriptors)
    }

    /// Wait until every initial load has finished
    ///
    /// Refresh timers keep running afterwards.
    pub async fn wait_for_initial_loads(&self) {
        let handles: Vec<_> = self.loads().drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Initial load task panicked");
                }
            }
        }
    }

    /// Start, then run until SIGTERM or SIGINT, then shut down
    pub async fn run(&self) -> Result<()> {
        self.start().await?;

        #[cfg(unix)]
        self.wait_for_signals().await?;

        #[cfg(not(unix))]
        tokio::signal::ctrl_c().await.map_err(|e| {
            crate::GraphFedError::Other(format!("Failed to listen for Ctrl-C: {}", e))
        })?;

        tracing::info!("Performing shutdown cleanup");
        self.shutdown();
        Ok(())
    }

    #[cfg(unix)]
    async fn wait_for_signals(&self) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            crate::GraphFedError::Other(format!("Failed to set up SIGTERM handler: {}", e))
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            crate::GraphFedError::Other(format!("Failed to set up SIGINT handler: {}", e))
        })?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
        Ok(())
    }

    /// Cancel in-flight loads and every refresh timer
    ///
    /// The composite view keeps whatever was merged before shutdown.
    pub fn shutdown(&self) {
        for handle in self.loads().drain(..) {
            handle.abort();
        }
        self.scheduler.cancel_all();

        if self.running.swap(false, Ordering::SeqCst) {
            let stats = self.stats();
            tracing::info!(
                active = stats.active,
                failed = stats.failed,
                assertions = stats.assertions,
                "Federation session shutdown complete"
            );
        }
        self.events.send(FederationEvent::Stopped);
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        let statuses = self.loader.statuses();
        let failed = statuses
            .iter()
            .filter(|s| s.state == SourceState::Failed)
            .count();

        SessionStats {
            registry: self.config.registry_location(),
            declared: self.declared_mut().len(),
            active: self.loader.active_count(),
            failed,
            scheduled: self.scheduler.len(),
            assertions: self.composite.len(),
            generation: self.composite.generation(),
        }
    }
}

impl Drop for FederationSession {
    fn drop(&mut self) {
        for handle in self.loads().drain(..) {
            handle.abort();
        }
        self.scheduler.cancel_all();
    }
}

async fn initial_load(
    load: impl Future<Output = std::result::Result<usize, LoadError>>,
    scheduler: Arc<RefreshScheduler>,
    descriptor: SourceDescriptor,
) {
    // Failures are already reported by the loader
    if load.await.is_err() {
        return;
    }
    if let Some(interval) = descriptor.poll_interval {
        scheduler.schedule(descriptor.location, interval);
    }
}

/// Session statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Bootstrap registry location
    pub registry: SourceLocation,

    /// Entries declared by the registry, duplicates included
    pub declared: usize,

    /// Sources merged at least once
    pub active: usize,

    /// Sources that never loaded
    pub failed: usize,

    /// Armed refresh timers
    pub scheduled: usize,

    /// Distinct assertions in the composite view
    pub assertions: usize,

    /// Composite view generation
    pub generation: u64,
}

/// Builder for a federation session
pub struct FederationSessionBuilder {
    config: FederationConfig,
    fetcher: Option<Arc<dyn SourceFetcher>>,
}

impl FederationSessionBuilder {
    /// Create a builder for the given registry location
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            config: FederationConfig::new(registry),
            fetcher: None,
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: FederationConfig) -> Self {
        Self {
            config,
            fetcher: None,
        }
    }

    /// Set the registry container resource
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.config.container = container.into();
        self
    }

    /// Set the poll interval predicate
    pub fn poll_interval_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.config.poll_interval_predicate = predicate.into();
        self
    }

    /// Set the event channel capacity
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    /// Use a custom fetcher instead of network and filesystem access
    pub fn fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Build the session
    pub fn build(self) -> Result<FederationSession> {
        match self.fetcher {
            Some(fetcher) => {
                self.config.validate()?;
                Ok(FederationSession::new(self.config, fetcher))
            }
            None => FederationSession::from_config(self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LoadKind;
    use crate::fetch::MemoryFetcher;
    use crate::graph::{Assertion, Term};
    use crate::GraphFedError;
    use std::time::Duration;

    const REGISTRY: &str = "http://example.com/registry.rdf";
    const A: &str = "http://example.com/a.nt";
    const B: &str = "http://example.com/b.nt";

    fn registry_xml(entries: &[(&str, Option<&str>)]) -> String {
        let mut items = String::new();
        let mut descriptions = String::new();
        for (location, interval) in entries {
            items.push_str(&format!("    <RDF:li RDF:resource=\"{}\"/>\n", location));
            if let Some(interval) = interval {
                descriptions.push_str(&format!(
                    "  <RDF:Description RDF:about=\"{}\" NC:poll-interval=\"{}\"/>\n",
                    location, interval
                ));
            }
        }
        format!(
            r#"<?xml version="1.0"?>
<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:NC="http://home.netscape.com/NC-rdf#">
  <RDF:Seq RDF:about="NC:FlashDataSources">
{}  </RDF:Seq>
{}</RDF:RDF>"#,
            items, descriptions
        )
    }

    fn session(fetcher: &Arc<MemoryFetcher>) -> FederationSession {
        FederationSessionBuilder::new(REGISTRY)
            .fetcher(fetcher.clone())
            .build()
            .unwrap()
    }

    fn fact(s: &str) -> Assertion {
        Assertion::new(s, "urn:p", Term::literal("v"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_good_and_bad_sources() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(A, Some("60")), (B, Some("60"))]));
        fetcher.insert_ntriples(A, "<urn:a> <urn:p> \"v\" .\n");
        fetcher.fail(B, LoadError::Network("connection refused".into()));

        let session = session(&fetcher);
        let descriptors = session.start().await.unwrap();
        assert_eq!(descriptors.len(), 2);
        session.wait_for_initial_loads().await;

        let graph = session.composite().current_graph();
        assert_eq!(graph.sources, vec![SourceLocation::new(A)]);
        assert!(graph.assertions.contains(&fact("urn:a")));

        // Only the source that loaded gets a refresh timer
        assert!(session.scheduler().is_scheduled(&A.into()));
        assert!(!session.scheduler().is_scheduled(&B.into()));

        let stats = session.stats();
        assert_eq!(stats.declared, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.scheduled, 1);

        session.shutdown();
        assert!(session.scheduler().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_does_not_block_others() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(A, None), (B, None)]));
        fetcher.insert_ntriples(A, "<urn:a> <urn:p> \"v\" .\n");
        fetcher.insert_ntriples(B, "<urn:b> <urn:p> \"v\" .\n");
        fetcher.set_delay(A, Duration::from_secs(30));

        let session = session(&fetcher);
        let mut rx = session.subscribe();
        session.start().await.unwrap();

        // B completes first even though A was initiated first
        let mut loaded = Vec::new();
        while loaded.len() < 2 {
            if let FederationEvent::SourceLoaded { location, .. } = rx.recv().await.unwrap() {
                loaded.push(location);
            }
        }
        assert_eq!(loaded, vec![SourceLocation::new(B), SourceLocation::new(A)]);

        session.wait_for_initial_loads().await;
        assert_eq!(session.composite().len(), 2);
    }

    #[tokio::test]
    async fn test_loads_initiated_in_registry_order() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let c = "http://example.com/c.nt";
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(B, None), (c, None), (A, None)]));

        let session = session(&fetcher);
        let mut rx = session.subscribe();
        session.start().await.unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            FederationEvent::RegistryLoaded { sources: 3, .. }
        ));
        let mut started = Vec::new();
        while started.len() < 3 {
            if let FederationEvent::LoadStarted { location, .. } = rx.recv().await.unwrap() {
                started.push(location.to_string());
            }
        }
        assert_eq!(started, vec![B, c, A]);
        session.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_entry_never_overwrites_reloaded_content() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(A, Some("5")), (A, None)]));
        fetcher.insert_ntriples(A, "<urn:a> <urn:p> \"first\" .\n");
        fetcher.set_delay(A, Duration::from_secs(2));

        let session = session(&fetcher);
        let mut rx = session.subscribe();
        session.start().await.unwrap();
        session.wait_for_initial_loads().await;

        // The second entry reuses the first entry's store
        assert_eq!(fetcher.fetch_count(&A.into()), 1);
        assert_eq!(session.scheduler().len(), 1);

        fetcher.insert_ntriples(A, "<urn:a> <urn:p> \"second\" .\n");
        loop {
            if let FederationEvent::SourceLoaded {
                kind: LoadKind::Reload,
                ..
            } = rx.recv().await.unwrap()
            {
                break;
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let second = Assertion::new("urn:a", "urn:p", Term::literal("second"));
        let first = Assertion::new("urn:a", "urn:p", Term::literal("first"));
        assert!(session.composite().contains(&second));
        assert!(!session.composite().contains(&first));
        assert_eq!(session.composite().len(), 1);
        session.shutdown();
    }

    #[tokio::test]
    async fn test_registry_unavailable_loads_nothing() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.fail(REGISTRY, LoadError::Http {
            location: REGISTRY.into(),
            status: 404,
        });
        fetcher.insert_ntriples(A, "<urn:a> <urn:p> \"v\" .\n");

        let session = session(&fetcher);
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, GraphFedError::RegistryUnavailable { .. }));
        assert!(err.is_fatal());

        session.wait_for_initial_loads().await;
        assert!(session.composite().is_empty());
        assert_eq!(fetcher.fetch_count(&A.into()), 0);
        assert!(!session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_emits_stopped_and_cancels_loads() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(A, Some("5"))]));
        fetcher.insert_ntriples(A, "<urn:a> <urn:p> \"v\" .\n");
        fetcher.set_delay(A, Duration::from_secs(10));

        let session = session(&fetcher);
        let mut rx = session.subscribe();
        session.start().await.unwrap();
        assert!(session.is_running());

        session.shutdown();
        session.wait_for_initial_loads().await;
        assert!(!session.is_running());
        assert!(session.composite().is_empty());
        assert!(session.scheduler().is_empty());

        let mut saw_stopped = false;
        while let Ok(event) = rx.try_recv() {
            saw_stopped |= event == FederationEvent::Stopped;
        }
        assert!(saw_stopped);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = FederationSessionBuilder::new("")
            .fetcher(Arc::new(MemoryFetcher::new()))
            .build();
        assert!(matches!(result, Err(GraphFedError::Config(_))));
    }
}

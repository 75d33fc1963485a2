//! Federation events
//!
//! Everything the presentation layer needs to refresh incrementally is
//! broadcast here: `SourceLoaded` and `SourceFailed` fire once per load
//! attempt, in completion order, independently for each source.

use crate::error::LoadError;
use crate::graph::SourceLocation;
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;

/// Whether a load is the first one for a source or a scheduled refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    Initial,
    Reload,
}

impl LoadKind {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadKind::Initial => "initial",
            LoadKind::Reload => "reload",
        }
    }
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by a federation session
#[derive(Debug, Clone, PartialEq)]
pub enum FederationEvent {
    /// Registry loaded and enumerated
    RegistryLoaded {
        location: SourceLocation,
        sources: usize,
    },

    /// A load was initiated (initial loads fire in registry order)
    LoadStarted {
        location: SourceLocation,
        kind: LoadKind,
    },

    /// A source was merged into the composite view
    SourceLoaded {
        location: SourceLocation,
        assertions: usize,
        kind: LoadKind,
    },

    /// A source failed to load; nothing else is affected
    SourceFailed {
        location: SourceLocation,
        error: LoadError,
        kind: LoadKind,
    },

    /// Periodic reload armed for a source
    RefreshScheduled {
        location: SourceLocation,
        interval: Duration,
    },

    /// Session shut down
    Stopped,
}

impl FederationEvent {
    /// Location the event concerns, if any
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            FederationEvent::RegistryLoaded { location, .. }
            | FederationEvent::LoadStarted { location, .. }
            | FederationEvent::SourceLoaded { location, .. }
            | FederationEvent::SourceFailed { location, .. }
            | FederationEvent::RefreshScheduled { location, .. } => Some(location),
            FederationEvent::Stopped => None,
        }
    }
}

impl fmt::Display for FederationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FederationEvent::RegistryLoaded { location, sources } => {
                write!(f, "registry {} lists {} sources", location, sources)
            }
            FederationEvent::LoadStarted { location, kind } => {
                write!(f, "{} load started: {}", kind, location)
            }
            FederationEvent::SourceLoaded {
                location,
                assertions,
                kind,
            } => write!(f, "{} load ok: {} ({} assertions)", kind, location, assertions),
            FederationEvent::SourceFailed {
                location,
                error,
                kind,
            } => write!(f, "{} load failed: {}: {}", kind, location, error),
            FederationEvent::RefreshScheduled { location, interval } => {
                write!(f, "refresh scheduled: {} every {:?}", location, interval)
            }
            FederationEvent::Stopped => f.write_str("stopped"),
        }
    }
}

/// Broadcast channel for [`FederationEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FederationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus holding up to `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Get an event subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<FederationEvent> {
        self.tx.subscribe()
    }

    /// Send an event, logging if nobody is listening or the channel is filling up
    pub fn send(&self, event: FederationEvent) {
        match self.tx.send(event) {
            Ok(_) => {
                let len = self.tx.len();
                if len > self.capacity * 80 / 100 {
                    tracing::warn!(
                        current = len,
                        capacity = self.capacity,
                        threshold_pct = 80,
                        "Event channel nearing capacity"
                    );
                }
            }
            Err(_) => {
                tracing::trace!("Event sent but no receivers subscribed");
            }
        }
    }
}

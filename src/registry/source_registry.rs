//! Bootstrap registry loading and source enumeration

use super::StoreCache;
use crate::config::FederationConfig;
use crate::fetch::SourceFetcher;
use crate::graph::{GraphStore, SourceLocation, Term};
use crate::{GraphFedError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;

/// Registry vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Container resource whose members are the sources
    pub container: String,

    /// Predicate holding each member's poll interval
    pub poll_interval_predicate: String,
}

impl From<&FederationConfig> for RegistryOptions {
    fn from(config: &FederationConfig) -> Self {
        Self {
            container: config.container.clone(),
            poll_interval_predicate: config.poll_interval_predicate.clone(),
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from(&FederationConfig::default())
    }
}

/// A declared data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Where the source lives
    pub location: SourceLocation,

    /// How often to reload it, if at all
    #[serde(
        rename = "poll_interval_secs",
        serialize_with = "serialize_interval",
        deserialize_with = "deserialize_interval",
        default
    )]
    pub poll_interval: Option<Duration>,
}

impl SourceDescriptor {
    /// Create a descriptor without a poll interval
    pub fn new(location: impl Into<SourceLocation>) -> Self {
        Self {
            location: location.into(),
            poll_interval: None,
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }
}

fn serialize_interval<S: Serializer>(
    interval: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    interval.map(|d| d.as_secs_f64()).serialize(serializer)
}

fn deserialize_interval<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error> {
    let secs: Option<f64> = Option::deserialize(deserializer)?;
    Ok(secs.and_then(|s| parse_poll_interval(&s.to_string())))
}

/// Parse a poll interval literal (seconds)
///
/// Accepts any positive finite number, fractions included. Anything else means
/// "no scheduled refresh".
pub fn parse_poll_interval(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// The loaded bootstrap registry
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    store: Arc<GraphStore>,
    options: RegistryOptions,
}

impl SourceRegistry {
    /// Load the bootstrap registry
    ///
    /// Completes only once the whole registry is parsed. If the location was
    /// already loaded in this cache, the existing store is reused. Any failure
    /// is reported as `RegistryUnavailable` and leaves the cache untouched.
    pub async fn load(
        fetcher: &dyn SourceFetcher,
        cache: &StoreCache,
        options: RegistryOptions,
        bootstrap: &SourceLocation,
    ) -> Result<Self> {
        if let Some(store) = cache.get(bootstrap) {
            tracing::debug!(location = %bootstrap, "Registry already loaded, reusing it");
            return Self::from_store(store, options);
        }

        tracing::info!(location = %bootstrap, "Loading source registry");

        let document = fetcher
            .fetch(bootstrap)
            .await
            .map_err(|e| GraphFedError::registry_unavailable(bootstrap.as_str(), e))?;
        let store = GraphStore::parse(bootstrap.clone(), &document.body, document.format(bootstrap))
            .map_err(|e| GraphFedError::registry_unavailable(bootstrap.as_str(), e))?;

        let registry = Self::from_store(Arc::new(store), options)?;
        cache.insert(registry.store.clone());
        Ok(registry)
    }

    /// Wrap an already-parsed registry store
    ///
    /// Fails if the store does not declare the container resource.
    pub fn from_store(store: Arc<GraphStore>, options: RegistryOptions) -> Result<Self> {
        if !store.is_container(&options.container) {
            return Err(GraphFedError::registry_unavailable(
                store.location().as_str(),
                format!("container {} not found", options.container),
            ));
        }
        Ok(Self { store, options })
    }

    /// Location the registry was loaded from
    pub fn location(&self) -> &SourceLocation {
        self.store.location()
    }

    /// The registry's own assertions
    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Declared sources, in container order
    ///
    /// Duplicates are kept; literal members are skipped since they name no location.
    pub fn enumerate(&self) -> Vec<SourceDescriptor> {
        let mut descriptors = Vec::new();

        for member in self.store.container_members(&self.options.container) {
            let location = match member {
                Term::Resource(uri) => uri,
                Term::Literal(value) => {
                    tracing::warn!(value = %value, "Ignoring literal registry member");
                    continue;
                }
            };

            let poll_interval = match self
                .store
                .lookup_literal(location, &self.options.poll_interval_predicate)
            {
                Some(raw) => {
                    let interval = parse_poll_interval(raw);
                    if interval.is_none() {
                        tracing::warn!(
                            location = %location,
                            value = %raw,
                            "Ignoring invalid poll interval"
                        );
                    }
                    interval
                }
                None => None,
            };

            descriptors.push(SourceDescriptor {
                location: SourceLocation::new(location.as_str()),
                poll_interval,
            });
        }

        tracing::debug!(count = descriptors.len(), "Enumerated registry sources");
        descriptors
    }
}

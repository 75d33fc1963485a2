//! graphfed configuration file handling
//!
//! Loads and manages the ~/.config/graphfed/config.yaml file.

use crate::graph::SourceLocation;
use crate::{GraphFedError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Container resource listing the sources in a registry
pub const DEFAULT_CONTAINER: &str = "NC:FlashDataSources";

/// Predicate carrying a source's poll interval (seconds, as a literal)
pub const DEFAULT_POLL_INTERVAL_PREDICATE: &str = "http://home.netscape.com/NC-rdf#poll-interval";

/// Default event broadcast channel capacity
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// HTTP/file fetch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("graphfed/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// graphfed configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Bootstrap registry location
    #[serde(default)]
    pub registry: String,

    /// Container resource enumerated in the registry
    #[serde(default = "default_container")]
    pub container: String,

    /// Predicate read for each source's poll interval
    #[serde(default = "default_poll_interval_predicate")]
    pub poll_interval_predicate: String,

    /// Fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Event broadcast channel capacity
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_poll_interval_predicate() -> String {
    DEFAULT_POLL_INTERVAL_PREDICATE.to_string()
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

impl FederationConfig {
    /// Create a configuration for a registry location
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            ..Default::default()
        }
    }

    /// Set the container resource
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Set the poll interval predicate
    pub fn with_poll_interval_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.poll_interval_predicate = predicate.into();
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Bootstrap registry as a location
    pub fn registry_location(&self) -> SourceLocation {
        SourceLocation::new(self.registry.clone())
    }

    /// Load configuration from the default path (~/.config/graphfed/config.yaml)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GraphFedError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading graphfed configuration");

        let content = fs::read_to_string(path)?;
        let config: FederationConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving graphfed configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Default config path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("graphfed");
        path.push("config.yaml");
        path
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.registry.trim().is_empty() {
            problems.push("registry location is empty");
        }
        if self.container.trim().is_empty() {
            problems.push("container resource is empty");
        }
        if self.poll_interval_predicate.trim().is_empty() {
            problems.push("poll interval predicate is empty");
        }
        if self.fetch.timeout_secs == 0 {
            problems.push("fetch timeout must be positive");
        }
        if self.event_channel_capacity == 0 {
            problems.push("event channel capacity must be positive");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(GraphFedError::Config(problems.join("; ")))
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            registry: String::new(),
            container: default_container(),
            poll_interval_predicate: default_poll_interval_predicate(),
            fetch: FetchConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = FederationConfig::new("file:///etc/graphfed/registry.rdf");
        assert_eq!(config.container, "NC:FlashDataSources");
        assert_eq!(
            config.poll_interval_predicate,
            "http://home.netscape.com/NC-rdf#poll-interval"
        );
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.user_agent.starts_with("graphfed/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let config = FederationConfig::new("http://example.com/registry.rdf")
            .with_container("urn:sources")
            .with_event_channel_capacity(16);
        config.save(path).unwrap();

        let loaded = FederationConfig::load(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: FederationConfig =
            serde_yaml::from_str("registry: /srv/registry.rdf\nfetch:\n  timeout_secs: 5\n")
                .unwrap();
        assert_eq!(config.registry, "/srv/registry.rdf");
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.container, DEFAULT_CONTAINER);
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut config = FederationConfig::default();
        config.fetch.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("registry location is empty"));
        assert!(err.contains("fetch timeout must be positive"));
    }

    #[test]
    fn test_default_path() {
        let path = FederationConfig::default_path();
        assert!(path.ends_with("graphfed/config.yaml"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = FederationConfig::load("/nonexistent/config.yaml");
        assert!(matches!(result, Err(GraphFedError::Config(_))));
    }
}

//! Configuration system
//!
//! Loads ~/.config/graphfed/config.yaml with:
//! - The bootstrap registry location
//! - Registry vocabulary (container resource, poll interval predicate)
//! - Fetch settings (timeout, user agent)
//! - Event channel sizing

mod federation_config;

pub use federation_config::{
    FederationConfig, FetchConfig, DEFAULT_CONTAINER, DEFAULT_EVENT_CHANNEL_CAPACITY,
    DEFAULT_POLL_INTERVAL_PREDICATE,
};

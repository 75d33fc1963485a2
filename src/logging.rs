//! Logging configuration using tracing
//!
//! Structured logging to stderr, filtered by RUST_LOG.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the quiet CLI default
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init() -> crate::Result<()> {
    init_with_verbosity(0)
}

/// Initialize the tracing subscriber
///
/// RUST_LOG always wins. Without it the filter is `warn`, raised to `info`
/// for a verbosity of 1 and `debug` above that.
///
/// # Example RUST_LOG values
/// - `RUST_LOG=info` - Show info and above
/// - `RUST_LOG=graphfed=trace` - Trace level for graphfed only
/// - `RUST_LOG=graphfed::scheduler=debug,reqwest=info` - Different levels per module
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init_with_verbosity(verbosity: u8) -> crate::Result<()> {
    let default = default_filter(verbosity);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| crate::GraphFedError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}

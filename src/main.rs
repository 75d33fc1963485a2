//! graphfed - Federated graph data sources
//!
//! Main entry point for the graphfed CLI.

use clap::{Parser, Subcommand};
use graphfed::config::FederationConfig;
use graphfed::events::FederationEvent;
use graphfed::loader::SourceState;
use graphfed::session::FederationSession;
use graphfed::GraphFedError;
use std::path::PathBuf;
use std::process;
use tokio::sync::broadcast::error::RecvError;

/// graphfed - Load, merge, and refresh federated graph data sources
#[derive(Parser, Debug)]
#[command(name = "graphfed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/graphfed/config.yaml)
    #[arg(short, long)]
    config: Option<String>,

    /// Bootstrap registry location (overrides the config file)
    #[arg(short, long, env = "GRAPHFED_REGISTRY")]
    registry: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// List the sources declared by the registry
    Sources {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load every source once and print the merged graph as N-Triples
    Dump,

    /// Load every source, keep refreshing, and print events until interrupted
    Watch,

    /// Load every source once and print Prometheus metrics
    Metrics,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = graphfed::logging::init_with_verbosity(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> graphfed::Result<()> {
    match &cli.command {
        Commands::Init => handle_init_command(&cli.config, &cli.registry),
        Commands::Sources { json } => {
            let (runtime, session) = open_session(&cli)?;
            runtime.block_on(handle_sources_command(&session, *json))
        }
        Commands::Dump => {
            let (runtime, session) = open_session(&cli)?;
            runtime.block_on(handle_dump_command(&session))
        }
        Commands::Watch => {
            let (runtime, session) = open_session(&cli)?;
            runtime.block_on(handle_watch_command(&session))
        }
        Commands::Metrics => {
            let (runtime, session) = open_session(&cli)?;
            runtime.block_on(handle_metrics_command(&session))
        }
    }
}

fn open_session(cli: &Cli) -> graphfed::Result<(tokio::runtime::Runtime, FederationSession)> {
    let config = load_config(cli)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let session = FederationSession::from_config(config)?;
    Ok((runtime, session))
}

fn load_config(cli: &Cli) -> graphfed::Result<FederationConfig> {
    let path = match &cli.config {
        Some(path) => PathBuf::from(path),
        None => FederationConfig::default_path(),
    };

    let mut config = if path.exists() {
        FederationConfig::load(&path)?
    } else {
        match &cli.registry {
            Some(registry) => FederationConfig::new(registry.clone()),
            None => {
                return Err(GraphFedError::Config(format!(
                    "No configuration found at {}. Run 'graphfed init --registry <location>' \
                     first, or pass --registry.",
                    path.display()
                )));
            }
        }
    };

    if let Some(registry) = &cli.registry {
        config.registry = registry.clone();
    }
    config.validate()?;
    Ok(config)
}

fn handle_init_command(
    config_path: &Option<String>,
    registry: &Option<String>,
) -> graphfed::Result<()> {
    let config_file = match config_path {
        Some(path) => PathBuf::from(path),
        None => FederationConfig::default_path(),
    };

    if config_file.exists() {
        println!("Configuration already exists at {}", config_file.display());
        return Ok(());
    }

    let config = FederationConfig::new(registry.clone().unwrap_or_default());
    config.save(&config_file)?;

    println!("✓ Created configuration at {}", config_file.display());
    if registry.is_none() {
        println!();
        println!("Next steps:");
        println!("  Set 'registry' in the file to your bootstrap registry location,");
        println!("  or pass --registry on each run.");
    }
    Ok(())
}

async fn handle_sources_command(session: &FederationSession, json: bool) -> graphfed::Result<()> {
    let registry = session.load_registry().await?;
    let descriptors = registry.enumerate();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!("Registry: {}", registry.location());
    println!();
    if descriptors.is_empty() {
        println!("  (no sources declared)");
    }
    for (i, descriptor) in descriptors.iter().enumerate() {
        match descriptor.poll_interval {
            Some(interval) => println!(
                "  {:>3}. {}  (every {}s)",
                i + 1,
                descriptor.location,
                interval.as_secs_f64()
            ),
            None => println!("  {:>3}. {}", i + 1, descriptor.location),
        }
    }
    Ok(())
}

async fn load_once(session: &FederationSession) -> graphfed::Result<()> {
    session.start().await?;
    session.wait_for_initial_loads().await;
    session.shutdown();

    for status in session.loader().statuses() {
        if status.state == SourceState::Failed {
            let reason = status
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            eprintln!("warning: {} failed to load: {}", status.location, reason);
        }
    }
    Ok(())
}

async fn handle_dump_command(session: &FederationSession) -> graphfed::Result<()> {
    load_once(session).await?;

    for assertion in &session.composite().current_graph().assertions {
        println!("{}", assertion);
    }

    let stats = session.stats();
    eprintln!(
        "{} assertions from {} of {} sources",
        stats.assertions, stats.active, stats.declared
    );
    Ok(())
}

async fn handle_watch_command(session: &FederationSession) -> graphfed::Result<()> {
    let mut rx = session.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(FederationEvent::Stopped) => {
                    println!("stopped");
                    break;
                }
                Ok(event) => println!("{}", event),
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("warning: {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = session.run().await;
    if result.is_err() {
        printer.abort();
    }
    let _ = printer.await;
    result
}

async fn handle_metrics_command(session: &FederationSession) -> graphfed::Result<()> {
    load_once(session).await?;
    print!("{}", graphfed::metrics::encode_metrics()?);
    Ok(())
}

//! confpath: resolve path-scoped configuration from the command line.
//!
//! # Architecture Overview
//!
//! ```text
//!   get / resolve                         watch
//!        │                                  │
//!        ▼                                  ▼
//!  ┌──────────────┐                 ┌───────────────┐
//!  │   Engine     │◀── saves ───────│ ConfigWatcher │── ReloadSignal ──▶ log + clear
//!  │  (startup)   │                 └───────▲───────┘
//!  └──────┬───────┘                         │ disable/enable
//!         ▼                                 │
//!  PathResolver → DocumentStore → LocationOverride → SectionCache
//!                                         ▲
//!                                SaveCoordinator ──┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use confpath::config::{apply_env_and_validate, load_config, ConfigWatcher, EngineConfig};
use confpath::lifecycle::{signals, Engine};
use confpath::observability::{logging, metrics};
use confpath::save::{NoopWatch, TokioScheduler, WatchControl};
use confpath::{RequestContext, SectionRegistry};

#[derive(Parser)]
#[command(name = "confpath")]
#[command(about = "Resolve path-scoped configuration sections", long_about = None)]
struct Cli {
    /// Engine configuration file; defaults to the current directory as application root
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a section for a path and print it as JSON
    Get {
        section: String,
        path: String,
        /// Literal path of the in-flight request, used to narrow overrides
        #[arg(long)]
        request: Option<String>,
    },
    /// Show the document owning a path
    Resolve { path: String },
    /// Watch documents and report reloads until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = EngineConfig::default();
            config.application.physical_root = std::env::current_dir()?;
            apply_env_and_validate(config)?
        }
    };
    logging::init(&config.observability.log_level)?;

    match cli.command {
        Commands::Get { section, path, request } => {
            let engine = engine(config, Arc::new(NoopWatch));
            let request = request.map(RequestContext::new);
            match engine.get_section(&section, &path, request.as_ref())? {
                Some(resolved) => {
                    let output = json!({
                        "section": resolved.name(),
                        "document": resolved.document().as_str(),
                        "location": resolved.location(),
                        "value": resolved.raw(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                None => {
                    eprintln!("Section '{}' is not declared for {}", section, path);
                    std::process::exit(1);
                }
            }
        }
        Commands::Resolve { path } => {
            let engine = engine(config, Arc::new(NoopWatch));
            let owner = engine.service().resolver().resolve(&path);
            let output = json!({
                "path": path,
                "owner": owner.virtual_path.as_str(),
                "location": owner.location,
                "document": engine.store().document_file(&owner.location),
                "outside_application": owner.outside_application,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Watch => watch(config).await?,
    }

    Ok(())
}

fn engine(config: EngineConfig, watch: Arc<dyn WatchControl>) -> Engine {
    Engine::new(config, SectionRegistry::new(), watch, Arc::new(TokioScheduler::current()))
}

async fn watch(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (watcher, mut reloads) = ConfigWatcher::from_config(&config)?;
    let engine = engine(config, Arc::new(watcher.handle()));
    let _guard = watcher.run()?;

    let stop = signals::shutdown_signal();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            signal = reloads.recv() => {
                let Some(signal) = signal else { break };
                if engine.coordinator().is_reload_suppressed() {
                    tracing::debug!(path = ?signal.path, "Reload suppressed during save");
                    continue;
                }
                engine.cache().clear();
                tracing::info!(path = ?signal.path, "Configuration changed on disk, cached sections dropped");
            }
            _ = &mut stop => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

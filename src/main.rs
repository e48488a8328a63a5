//! Quickstart node proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   :8090 ──▶ FULL-NODE     ──▶ 127.0.0.1:18190     (+ /admin, served locally)
//!   :8091 ──▶ SOLIDITY-NODE ──▶ 127.0.0.1:18191
//!   :8092 ──▶ EVENT-SERVER  ──▶ 127.0.0.1:18891
//!
//!   per request:
//!     access log ─▶ request interceptor ─▶ backend ─▶ response interceptor
//!                          │                 │
//!                          └── error ◀───────┘  (500 text/plain)
//! ```

use std::path::PathBuf;

use clap::Parser;

use quickstart_proxy::config::loader::{apply_env_overrides, load_config};
use quickstart_proxy::config::watcher::{apply_updates, ConfigWatcher};
use quickstart_proxy::config::{ProxyConfig, VerbosityConfig};
use quickstart_proxy::lifecycle::signals::wait_for_shutdown_signal;
use quickstart_proxy::lifecycle::{ProxyRegistry, Shutdown};
use quickstart_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "quickstart-proxy")]
#[command(
    about = "CORS-enabling reverse proxy for local full node, solidity node and event server",
    long_about = None
)]
struct Cli {
    /// TOML configuration file; watched for verbosity changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log request and response traffic.
    #[arg(long)]
    verbose: bool,

    /// Log query strings (with --verbose).
    #[arg(long)]
    show_query_string: bool,

    /// Log POST bodies (with --verbose).
    #[arg(long)]
    show_body: bool,

    /// Pretty-print logged JSON.
    #[arg(long)]
    format_json: bool,
}

impl Cli {
    fn apply(&self, verbosity: &mut VerbosityConfig) {
        verbosity.verbose |= self.verbose;
        verbosity.show_query_string |= self.show_query_string;
        verbosity.show_body |= self.show_body;
        verbosity.format_json |= self.format_json;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config.verbosity);
    cli.apply(&mut config.verbosity);

    logging::init(&config.observability);
    tracing::info!("quickstart-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        instances = config.instances.len(),
        verbosity = ?config.verbosity,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let verbosity = config.verbosity_handle();

    // Dropping the watcher stops it, so it lives as long as main.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            tokio::spawn(apply_updates(
                updates,
                verbosity.clone(),
                config.instances.clone(),
            ));
            Some(watcher.run()?)
        }
        None => None,
    };

    let registry = ProxyRegistry::from_config(&config, verbosity)?;
    let shutdown = Shutdown::new();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    registry.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

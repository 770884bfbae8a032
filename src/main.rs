//! Tools directory server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!         → http server (request id, trace, timeout, body limit)
//!         → rate limiter (api bucket)
//!         → handlers ─┬─ quota policy ──── store (settings, tracking)
//!                     ├─ score resolution
//!                     └─ checkout sessions
//!
//!     config watcher ──▶ limiter / quota / checkout reload
//!     signals ──▶ shutdown ──▶ drain ──▶ store snapshot
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use website_tools::config::watcher::ConfigWatcher;
use website_tools::config::validation::validate_config;
use website_tools::config::{load_config, AppConfig, ConfigError};
use website_tools::http::HttpServer;
use website_tools::lifecycle::{wait_for_shutdown_signal, Shutdown};
use website_tools::observability::{logging, metrics};
use website_tools::store::MemoryStore;

#[derive(Parser)]
#[command(name = "website-tools")]
#[command(about = "AI website-builder tools directory service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Without one the defaults apply
    /// and the admin routes stay unmounted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            // The default admin key is a placeholder, so no admin surface.
            let mut config = AppConfig::default();
            config.admin.enabled = false;
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "website-tools starting");
    if !config.admin.enabled {
        tracing::warn!("Admin routes disabled");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit_enabled = config.rate_limit.enabled,
        fail_open = config.quota.fail_open,
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

    let store = Arc::new(match &config.storage.snapshot_path {
        Some(path) => MemoryStore::load_from_file(Path::new(path))?,
        None => MemoryStore::new(None),
    });

    // Keep the watcher alive for the life of the process.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(config, store.clone());
    server.run(listener, config_updates, server_shutdown).await?;

    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to save store snapshot");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

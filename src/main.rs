use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracetree::{
    config::{Config, LogFormat},
    explorer::Explorer,
    server::{AppState, RpcServer},
    storage::SqliteStore,
    tree::{DirectoryTreeSource, TreeClient, TreeSource},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "TraceTree starting...");

    // Initialize storage
    let store = match SqliteStore::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Pick the tree source
    let source: Box<dyn TreeSource> = match &config.trees.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Reading trees from directory");
            Box::new(DirectoryTreeSource::new(dir.clone()))
        }
        None => match TreeClient::new(&config.trees, config.request.clone()) {
            Ok(c) => {
                info!(base_url = %c.base_url(), "Tree client initialized");
                Box::new(c)
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize tree client");
                return Err(e.into());
            }
        },
    };

    // Fetch both trees and restore the last-used variant
    let explorer = match Explorer::start(&config, source.as_ref(), store).await {
        Ok(explorer) => explorer,
        Err(e) => {
            error!(error = %e, "Failed to load trees");
            return Err(e.into());
        }
    };

    let server = RpcServer::new(Arc::new(AppState::new(explorer)));

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging. Stdout carries responses, so logs go to stderr.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

//! Startup orchestration.
//!
//! # Order
//! 1. Rule store and registry (rules must exist before traffic)
//! 2. Metrics exporter (optional)
//! 3. HTTP server on the bound listener
//!
//! Any error here is fatal.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{RulesConfig, ShieldConfig};
use crate::http::{HttpServer, ServerError};
use crate::observability::metrics;
use crate::rules::{FileRuleStore, Registry, RuleStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Build the file-backed registry described by `config`.
pub fn build_registry(config: &RulesConfig) -> Arc<Registry> {
    let mut store = FileRuleStore::new(&config.file);
    if let Some(bundled) = &config.bundled_file {
        store = store.with_bundled(bundled);
    }
    tracing::info!(path = %store.path().display(), "Using rules file");

    let store: Arc<dyn RuleStore> = Arc::new(store);
    Arc::new(Registry::new(store))
}

/// Assemble everything up to a ready-to-run server.
pub async fn prepare(
    config: ShieldConfig,
    registry: Arc<Registry>,
) -> Result<(HttpServer, TcpListener), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let server = HttpServer::new(config, registry)?;
    Ok((server, listener))
}

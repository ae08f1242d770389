//! Request Shield (v1)
//!
//! Screens inbound HTTP traffic against a priority-ordered set of
//! substring rules before it reaches the protected application.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 REQUEST SHIELD                 │
//!   Client Request       │  ┌─────────┐   ┌─────────────┐   ┌──────────┐ │
//!   ─────────────────────┼─▶│  http   │──▶│ interceptor │──▶│ upstream │─┼──▶ Application
//!                        │  │ server  │   └──────┬──────┘   └──────────┘ │
//!   403 on block  ◀──────┼──┤         │          │ snapshot              │
//!                        │  └────┬────┘   ┌──────▼──────┐                │
//!   Admin API            │       │        │  registry   │◀── SIGHUP      │
//!   ─────────────────────┼──────▶└───────▶│ state/index │                │
//!                        │                └──────┬──────┘                │
//!                        │                       ▼                       │
//!                        │                 rules file (JSON)             │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use request_shield::config::load_or_default;
use request_shield::lifecycle::{signals, startup, Shutdown};
use request_shield::observability::logging;

#[derive(Parser)]
#[command(name = "request-shield")]
#[command(about = "Rule-based request screening in front of an HTTP application", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "SHIELD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("request-shield v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules_file = %config.rules.file,
        upstream = ?config.upstream.address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let registry = startup::build_registry(&config.rules);
    tracing::info!(
        rules = registry.list_rules().len(),
        enabled = registry.is_enabled(),
        "Rule registry ready"
    );

    let (server, listener) = startup::prepare(config, registry.clone()).await?;

    let shutdown = Arc::new(Shutdown::new());
    let _hangup = signals::spawn_reload_on_hangup(registry)?;
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            signals::wait_for_termination().await;
            shutdown.trigger();
        });
    }

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

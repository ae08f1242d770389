//! OS signal handling.
//!
//! - SIGINT / SIGTERM → graceful shutdown
//! - SIGHUP → reload rules from the rules file (Unix only)

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::rules::Registry;

/// Resolve when the process is asked to terminate.
pub async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Reload rules from disk on every SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_on_hangup(registry: Arc<Registry>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading rules");
            let registry = registry.clone();
            match tokio::task::spawn_blocking(move || registry.reload_from_file()).await {
                Ok(Ok(source)) => tracing::info!(source = ?source, "Rules reloaded on SIGHUP"),
                Ok(Err(e)) => tracing::error!(error = %e, "Rule reload on SIGHUP failed"),
                Err(e) => tracing::error!(error = %e, "Rule reload task failed"),
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_reload_on_hangup(_registry: Arc<Registry>) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}

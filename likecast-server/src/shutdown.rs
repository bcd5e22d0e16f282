//! Signal handling for graceful shutdown.

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C). Falls back to Ctrl+C alone if
/// the Unix handlers cannot be installed.
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to install signal handlers, using Ctrl+C only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that flips the returned channel to `true` on the first
/// shutdown signal.
///
/// The sender is returned so the process can also trigger shutdown itself,
/// e.g. when the pipeline stops on its own.
pub fn spawn_shutdown_handler() -> watch::Sender<bool> {
    let (shutdown_tx, _) = watch::channel(false);
    let signal_tx = shutdown_tx.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        signal_tx.send_replace(true);
    });

    shutdown_tx
}

/// Completes once `shutdown_rx` observes `true` or its sender is gone.
pub async fn wait_for_shutdown(mut shutdown_rx: watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

use anyhow::Result;
use tokio::signal;

/// Wait for a termination signal (Ctrl+C, SIGTERM).
pub async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c().await.map_err(|e| {
            tracing::error!(%e, "failed to install Ctrl+C handler");
            e
        })
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut handler) => {
                handler.recv().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(%e, "failed to install SIGTERM handler");
                Err(e)
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            tracing::info!("received Ctrl+C");
        },
        result = terminate => {
            result?;
            tracing::info!("received SIGTERM");
        },
    }

    tracing::info!("shutdown signal received, starting graceful shutdown");
    Ok(())
}

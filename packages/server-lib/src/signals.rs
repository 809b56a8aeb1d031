//! Process shutdown signals.
use tracing::instrument;

/// Resolves when the process receives SIGINT (ctrl-c) or, on Unix, SIGTERM.
///
/// # Panics
///
/// Will panic if the signal handlers cannot be installed.
#[instrument(skip())]
pub async fn global_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("it should install the ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("it should install the terminate signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c"),
        () = terminate => tracing::info!("received terminate signal"),
    }
}

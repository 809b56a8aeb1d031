//! The Prometheus metrics endpoint.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use axum_server::Handle;
use chihaya_configuration::Metrics;
use chihaya_tracker_core::statistics::TrackerMetrics;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Starts the metrics server: `GET /metrics` in the Prometheus text
/// exposition format and a `GET /health` liveness probe.
///
/// # Errors
///
/// Will return an error if the configured address cannot be bound.
pub async fn start_job(
    config: &Metrics,
    metrics: Arc<TrackerMetrics>,
    halt: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let bind_address = config.bind_address;

    let app = Router::new()
        .route("/metrics", get(serve_metrics))
        .route("/health", get(|| async { "ok" }))
        .with_state(metrics);

    let handle = Handle::new();

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        halt.cancelled().await;
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
    });

    let server = axum_server::bind(bind_address).handle(handle.clone());

    let task = tokio::spawn(async move {
        if let Err(error) = server.serve(app.into_make_service()).await {
            tracing::error!(%error, %bind_address, "metrics server stopped serving");
        }
    });

    let local_addr: Option<SocketAddr> = handle.listening().await;
    let local_addr = local_addr.with_context(|| format!("could not bind the metrics server to {bind_address}"))?;

    tracing::info!(%local_addr, "metrics server listening");

    Ok(task)
}

async fn serve_metrics(State(metrics): State<Arc<TrackerMetrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render(),
    )
}

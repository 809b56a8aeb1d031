//! HTTP frontend job.
use std::sync::Arc;

use anyhow::Context;
use chihaya_axum_http_tracker_server::HttpServer;
use chihaya_configuration::HttpTracker;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::container::AppContainer;

/// Binds and starts one HTTP frontend instance.
///
/// # Errors
///
/// Will return an error if the configured address cannot be bound.
pub async fn start_job(
    config: &HttpTracker,
    container: &AppContainer,
    halt: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let server = HttpServer::new(
        Arc::new(config.clone()),
        container.logic.clone(),
        container.metrics.clone(),
    );

    let running = server
        .start(halt)
        .await
        .with_context(|| format!("could not start the http tracker on {}", config.bind_address))?;

    Ok(running.task)
}

//! UDP frontend job.
use std::sync::Arc;

use anyhow::Context;
use chihaya_configuration::UdpTracker;
use chihaya_udp_tracker_server::UdpServer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::container::AppContainer;

/// Binds and starts one UDP frontend instance.
///
/// # Errors
///
/// Will return an error if the configured address cannot be bound.
pub async fn start_job(
    config: &UdpTracker,
    container: &AppContainer,
    halt: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let server = UdpServer::new(
        Arc::new(config.clone()),
        container.logic.clone(),
        container.metrics.clone(),
    );

    let running = server
        .start(halt)
        .await
        .with_context(|| format!("could not start the udp tracker on {}", config.bind_address))?;

    Ok(running.task)
}

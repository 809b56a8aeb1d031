//! Application startup and job orchestration.
//!
//! Jobs started, depending on the configuration:
//!
//! - Peer-store garbage collection (always).
//! - The storage-gauge aggregation (always).
//! - One job per configured UDP frontend.
//! - One job per configured HTTP frontend.
//! - The Prometheus metrics endpoint, when configured.
use std::sync::Arc;

use chihaya_configuration::Configuration;

use crate::bootstrap::jobs::{self, manager::JobManager};
use crate::container::AppContainer;

/// Starts every configured job.
///
/// # Errors
///
/// Will return an error if a frontend or the metrics server cannot bind its
/// address. Jobs started before the failure keep running; the caller is
/// expected to exit, which tears them down.
pub async fn start(config: &Arc<Configuration>, container: &AppContainer) -> anyhow::Result<JobManager> {
    warn_if_no_services_enabled(config);

    let mut job_manager = JobManager::new();

    job_manager.push(
        "peer_store_gc",
        jobs::peer_store::start_gc_job(container, job_manager.new_cancellation_token()),
    );

    job_manager.push(
        "metrics_updater",
        jobs::peer_store::start_metrics_updater_job(container, job_manager.new_cancellation_token()),
    );

    if let Some(udp_trackers) = &config.udp_trackers {
        for (index, udp_config) in udp_trackers.iter().enumerate() {
            let handle = jobs::udp_tracker::start_job(udp_config, container, job_manager.new_cancellation_token()).await?;

            job_manager.push(format!("udp_tracker_{}_{}", index, udp_config.bind_address), handle);
        }
    } else {
        tracing::info!("no udp trackers in configuration");
    }

    if let Some(http_trackers) = &config.http_trackers {
        for (index, http_config) in http_trackers.iter().enumerate() {
            let handle = jobs::http_tracker::start_job(http_config, container, job_manager.new_cancellation_token()).await?;

            job_manager.push(format!("http_tracker_{}_{}", index, http_config.bind_address), handle);
        }
    } else {
        tracing::info!("no http trackers in configuration");
    }

    if let Some(metrics_config) = &config.metrics {
        let handle =
            jobs::metrics_server::start_job(metrics_config, container.metrics.clone(), job_manager.new_cancellation_token())
                .await?;

        job_manager.push("metrics_server", handle);
    } else {
        tracing::info!("no metrics endpoint in configuration");
    }

    Ok(job_manager)
}

fn warn_if_no_services_enabled(config: &Configuration) {
    let no_udp = config.udp_trackers.as_ref().map_or(true, Vec::is_empty);
    let no_http = config.http_trackers.as_ref().map_or(true, Vec::is_empty);

    if no_udp && no_http {
        tracing::warn!("no frontends enabled in configuration");
    }
}

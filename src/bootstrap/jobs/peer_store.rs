//! Peer-store background jobs: garbage collection and the statistics
//! aggregation.
use chihaya_tracker_core::statistics::run_metrics_updater;
use chihaya_tracker_core::storage::run_gc_loop;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::container::AppContainer;

/// Starts the garbage-collection loop.
pub fn start_gc_job(container: &AppContainer, halt: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run_gc_loop(
        container.store.clone(),
        container.storage_options.gc_interval,
        container.storage_options.peer_lifetime,
        halt,
    ))
}

/// Starts the periodic aggregation of the storage gauges.
pub fn start_metrics_updater_job(container: &AppContainer, halt: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run_metrics_updater(
        container.store.clone(),
        container.metrics.clone(),
        container.storage_options.prometheus_reporting_interval,
        halt,
    ))
}

//! Background job definitions.
//!
//! Every job is a named [`JoinHandle`](tokio::task::JoinHandle) registered
//! with the [`JobManager`](manager::JobManager), which owns the shared
//! cancellation token used for graceful shutdown.
pub mod http_tracker;
pub mod manager;
pub mod metrics_server;
pub mod peer_store;
pub mod udp_tracker;

//! Server lifecycle: bind, serve, graceful shutdown.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use chihaya_configuration::HttpTracker;
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::statistics::TrackerMetrics;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::v1::handlers::AppState;
use crate::v1::routes;

/// Seconds granted to in-flight connections on shutdown.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(90);

/// Errors raised while starting an HTTP frontend.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not bind http tracker to {bind_address}")]
    CouldNotBind { bind_address: SocketAddr },
}

/// A configured, not-yet-started HTTP frontend.
pub struct HttpServer {
    config: Arc<HttpTracker>,
    logic: Arc<Logic>,
    metrics: Arc<TrackerMetrics>,
}

/// A started HTTP frontend.
pub struct RunningHttpServer {
    /// The actually bound address (relevant when the configured port is 0).
    pub local_addr: SocketAddr,
    /// The serve task; finishes after graceful shutdown completes.
    pub task: JoinHandle<()>,
}

impl HttpServer {
    #[must_use]
    pub fn new(config: Arc<HttpTracker>, logic: Arc<Logic>, metrics: Arc<TrackerMetrics>) -> Self {
        Self { config, logic, metrics }
    }

    /// Binds and starts serving. Cancelling `halt` begins a graceful
    /// shutdown bounded by the grace period.
    ///
    /// # Errors
    ///
    /// Will return an error if the configured address cannot be bound.
    pub async fn start(self, halt: CancellationToken) -> Result<RunningHttpServer, Error> {
        let bind_address = self.config.bind_address;

        let state = AppState {
            config: self.config,
            logic: self.logic,
            metrics: self.metrics,
        };

        let app = routes::router(state);

        // TODO: feed idle_timeout into hyper-util's http1 connection timer
        // through axum-server's http_builder, so idle keep-alive connections
        // are closed at the configured bound instead of the library default.
        let handle = Handle::new();

        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            halt.cancelled().await;
            tracing::info!(%bind_address, "http tracker shutting down");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
        });

        let server = axum_server::bind(bind_address).handle(handle.clone());

        let task = tokio::spawn(async move {
            if let Err(error) = server
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
            {
                tracing::error!(%error, %bind_address, "http tracker stopped serving");
            }
        });

        let Some(local_addr) = handle.listening().await else {
            task.abort();
            return Err(Error::CouldNotBind { bind_address });
        };

        tracing::info!(%local_addr, "http tracker listening");

        Ok(RunningHttpServer { local_addr, task })
    }
}

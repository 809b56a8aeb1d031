//! Route definitions.
use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use super::handlers::{announce, scrape, AppState};

/// Builds the router for one HTTP frontend instance.
///
/// Request processing is bounded by the configured read plus write
/// timeouts; a request that cannot be read and answered within that window
/// gets a 408.
#[must_use]
pub fn router(state: AppState) -> Router {
    let request_timeout = state.config.read_timeout() + state.config.write_timeout();

    Router::new()
        .route("/announce", get(announce::handle))
        .route("/scrape", get(scrape::handle))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

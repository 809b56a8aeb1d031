//! Axum handlers for the `announce` and `scrape` routes.
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chihaya_configuration::HttpTracker;
use chihaya_http_protocol::v1::responses;
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::statistics::TrackerMetrics;

pub mod announce;
pub mod scrape;

/// Shared state of one HTTP frontend instance.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HttpTracker>,
    pub logic: Arc<Logic>,
    pub metrics: Arc<TrackerMetrics>,
}

/// Writes a client-visible failure. The HTTP status stays 200 so standard
/// clients read the bencoded body.
pub(crate) fn failure_response(reason: &str) -> Response {
    let body = responses::error::Error {
        failure_reason: reason.to_owned(),
    }
    .write();

    (StatusCode::OK, body).into_response()
}

/// Runs a chunk of request processing, converting a panic (a misbehaving
/// hook, typically) into a generic internal error instead of poisoning the
/// connection.
pub(crate) fn recover<T>(work: impl FnOnce() -> T) -> Result<T, Response> {
    std::panic::catch_unwind(AssertUnwindSafe(work)).map_err(|panic| {
        tracing::error!(?panic, "recovered a panic while processing a request");
        failure_response("internal error occurred")
    })
}

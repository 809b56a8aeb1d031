//! The `scrape` handler.
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chihaya_http_protocol::v1::query::Query;
use chihaya_http_protocol::v1::requests::scrape::Scrape;
use chihaya_http_protocol::v1::responses;
use chihaya_tracker_core::request::ScrapeRequest;

use super::{failure_response, recover, AppState};

/// Handles `GET /scrape`.
pub async fn handle(State(state): State<AppState>, RawQuery(raw_query): RawQuery) -> Response {
    tracing::debug!(?raw_query, "http scrape request");

    let scrape = match parse(raw_query.as_deref()) {
        Ok(scrape) => scrape,
        Err(reason) => return failure_response(&reason),
    };

    // HTTP scrapes aggregate both address families.
    let request = ScrapeRequest {
        info_hashes: scrape.info_hashes,
        address_family: None,
    };

    let outcome = recover(|| state.logic.handle_scrape(&request));

    let (mut response, mut context) = match outcome {
        Ok(Ok(pair)) => pair,
        Ok(Err(error)) => return failure_response(&error.to_string()),
        Err(response) => return response,
    };

    state.metrics.http_scrapes.inc();

    let body = responses::scrape::write(&response);

    let _ = recover(|| state.logic.after_scrape(&mut context, &request, &mut response));

    (StatusCode::OK, body).into_response()
}

fn parse(raw_query: Option<&str>) -> Result<Scrape, String> {
    let raw_query = raw_query.unwrap_or_default();

    let query = Query::parse(raw_query).map_err(|error| error.to_string())?;

    Scrape::try_from(&query).map_err(|error| error.to_string())
}

//! The `announce` handler.
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chihaya_http_protocol::v1::query::Query;
use chihaya_http_protocol::v1::requests::announce::Announce;
use chihaya_http_protocol::v1::responses;
use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::peer::Peer;
use chihaya_primitives::AddressFamily;
use chihaya_tracker_core::request::AnnounceRequest;

use super::{failure_response, recover, AppState};
use crate::v1::peer_ip_resolver;

/// Handles `GET /announce`.
pub async fn handle(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
) -> Response {
    tracing::debug!(?raw_query, %client_addr, "http announce request");

    let announce = match parse(raw_query.as_deref()) {
        Ok(announce) => announce,
        Err(reason) => return failure_response(&reason),
    };

    let request = canonical_request(&state, &announce, &headers, client_addr);

    let outcome = recover(|| state.logic.handle_announce(&request));

    let (mut response, mut context) = match outcome {
        Ok(Ok(pair)) => pair,
        Ok(Err(error)) => return failure_response(&error.to_string()),
        Err(response) => return response,
    };

    match request.address_family() {
        AddressFamily::Ipv4 => state.metrics.http_announces_ipv4.inc(),
        AddressFamily::Ipv6 => state.metrics.http_announces_ipv6.inc(),
    }

    let body = responses::announce::write(&response);

    // The client has its bytes; post-hook failures are the tracker's
    // problem, not the client's.
    let _ = recover(|| state.logic.after_announce(&mut context, &request, &mut response));

    (StatusCode::OK, body).into_response()
}

fn parse(raw_query: Option<&str>) -> Result<Announce, String> {
    let raw_query = raw_query.unwrap_or_default();

    let query = Query::parse(raw_query).map_err(|error| error.to_string())?;

    Announce::try_from(&query).map_err(|error| error.to_string())
}

/// Builds the canonical request: resolves the peer endpoint and applies the
/// frontend's numwant policy.
fn canonical_request(state: &AppState, announce: &Announce, headers: &HeaderMap, client_addr: SocketAddr) -> AnnounceRequest {
    // IPv4-mapped addresses (a v6 listener serving a v4 client) belong to
    // the IPv4 swarm, so the mapping is undone here.
    let peer_ip = peer_ip_resolver::resolve(&state.config, headers, announce.claimed_ip, client_addr.ip()).to_canonical();

    let num_want = announce
        .numwant
        .unwrap_or(state.config.default_numwant)
        .min(state.config.max_numwant);

    AnnounceRequest {
        info_hash: announce.info_hash,
        peer: Peer::new(announce.peer_id, SocketAddr::new(peer_ip, announce.port)),
        event: announce.event.unwrap_or(AnnounceEvent::None),
        uploaded: announce.uploaded.unwrap_or(0),
        downloaded: announce.downloaded.unwrap_or(0),
        left: announce.left.unwrap_or(0),
        num_want,
        compact: announce.compact.unwrap_or(false),
        params: announce.params.clone(),
    }
}

//! Packet handling: parse, dispatch, encode.
use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chihaya_configuration::UdpTracker;
use chihaya_primitives::peer::{Peer, PeerId};
use chihaya_primitives::AddressFamily;
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::request::{AnnounceRequest, ScrapeRequest};
use chihaya_tracker_core::statistics::TrackerMetrics;
use chihaya_udp_protocol::response::TorrentScrapeStatistics;
use chihaya_udp_protocol::{
    AnnounceResponse, ConnectResponse, ErrorResponse, Request, RequestParseError, Response, ResponsePeer, ScrapeResponse,
    TransactionId,
};

use crate::connection_id::ConnectionIdGenerator;
use crate::RawRequest;

/// Shared state of one UDP frontend instance.
pub struct UdpState {
    pub config: Arc<UdpTracker>,
    pub logic: Arc<Logic>,
    pub metrics: Arc<TrackerMetrics>,
    pub connection_ids: Arc<ConnectionIdGenerator>,
}

/// Handles one datagram. `None` means the packet could not even be
/// attributed to a transaction, so nothing is sent back (sending would make
/// the tracker a reflection vector).
#[must_use]
pub fn handle_packet(request: &RawRequest, state: &UdpState) -> Option<Response> {
    match Request::parse_bytes(&request.payload, state.config.max_scrape_infohashes) {
        Ok(Request::Connect(connect)) => Some(handle_connect(connect.transaction_id, request.from, state)),
        Ok(Request::Announce(announce)) => Some(handle_announce(&announce, request.from, state)),
        Ok(Request::Scrape(scrape)) => Some(handle_scrape(&scrape, request.from, state)),
        Err(RequestParseError::Sendable {
            transaction_id,
            message,
            ..
        }) => {
            state.metrics.udp_errors.inc();
            Some(error_response(transaction_id, &message))
        }
        Err(RequestParseError::Unsendable { message }) => {
            tracing::debug!(%message, from = %request.from, "dropping unparseable packet");
            None
        }
    }
}

fn handle_connect(transaction_id: TransactionId, from: SocketAddr, state: &UdpState) -> Response {
    state.metrics.udp_connects.inc();

    Response::Connect(ConnectResponse {
        transaction_id,
        connection_id: state.connection_ids.generate(from.ip()),
    })
}

fn handle_announce(announce: &chihaya_udp_protocol::AnnounceRequest, from: SocketAddr, state: &UdpState) -> Response {
    if !state.connection_ids.matches(announce.connection_id, from.ip()) {
        state.metrics.udp_errors.inc();
        return error_response(announce.transaction_id, "invalid connection id");
    }

    let request = canonical_announce(announce, from, &state.config);

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| state.logic.handle_announce(&request)));

    let (mut response, mut context) = match outcome {
        Ok(Ok(pair)) => pair,
        Ok(Err(error)) => {
            state.metrics.udp_errors.inc();
            return error_response(announce.transaction_id, &error.to_string());
        }
        Err(panic) => {
            tracing::error!(?panic, "recovered a panic while processing an announce");
            state.metrics.udp_errors.inc();
            return error_response(announce.transaction_id, "internal error occurred");
        }
    };

    let packet = build_announce_response(announce.transaction_id, &response, request.address_family());

    match request.address_family() {
        AddressFamily::Ipv4 => state.metrics.udp_announces_ipv4.inc(),
        AddressFamily::Ipv6 => state.metrics.udp_announces_ipv6.inc(),
    }

    let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
        state.logic.after_announce(&mut context, &request, &mut response);
    }));

    packet
}

fn handle_scrape(scrape: &chihaya_udp_protocol::ScrapeRequest, from: SocketAddr, state: &UdpState) -> Response {
    if !state.connection_ids.matches(scrape.connection_id, from.ip()) {
        state.metrics.udp_errors.inc();
        return error_response(scrape.transaction_id, "invalid connection id");
    }

    // UDP scrapes report the counts of the family the exchange runs over.
    let request = ScrapeRequest {
        info_hashes: scrape.info_hashes.clone(),
        address_family: Some(AddressFamily::of(&from.ip().to_canonical())),
    };

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| state.logic.handle_scrape(&request)));

    let (mut response, mut context) = match outcome {
        Ok(Ok(pair)) => pair,
        Ok(Err(error)) => {
            state.metrics.udp_errors.inc();
            return error_response(scrape.transaction_id, &error.to_string());
        }
        Err(panic) => {
            tracing::error!(?panic, "recovered a panic while processing a scrape");
            state.metrics.udp_errors.inc();
            return error_response(scrape.transaction_id, "internal error occurred");
        }
    };

    let torrent_stats = response
        .files
        .iter()
        .map(|(_, metadata)| TorrentScrapeStatistics {
            seeders: to_i32(metadata.complete),
            completed: to_i32(metadata.downloaded),
            leechers: to_i32(metadata.incomplete),
        })
        .collect();

    state.metrics.udp_scrapes.inc();

    let packet = Response::Scrape(ScrapeResponse {
        transaction_id: scrape.transaction_id,
        torrent_stats,
    });

    let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
        state.logic.after_scrape(&mut context, &request, &mut response);
    }));

    packet
}

/// Builds the canonical request: resolves the peer endpoint and applies the
/// frontend's numwant policy.
fn canonical_announce(announce: &chihaya_udp_protocol::AnnounceRequest, from: SocketAddr, config: &UdpTracker) -> AnnounceRequest {
    // BEP 15: most trackers only honor the IP field under limited
    // circumstances. Here it takes effect only when spoofing is allowed,
    // and the port always comes from the announce payload. IPv4-mapped
    // source addresses belong to the IPv4 swarm.
    let peer_ip = match announce.ip_address {
        Some(claimed) if config.allow_ip_spoofing => IpAddr::V4(claimed),
        _ => from.ip().to_canonical(),
    };

    let num_want = if announce.peers_wanted < 0 {
        config.default_numwant
    } else {
        #[allow(clippy::cast_sign_loss)]
        let wanted = announce.peers_wanted as u32;
        wanted.min(config.max_numwant)
    };

    AnnounceRequest {
        info_hash: announce.info_hash,
        peer: Peer::new(PeerId(announce.peer_id.0), SocketAddr::new(peer_ip, announce.port)),
        event: announce.event,
        uploaded: to_u64(announce.uploaded),
        downloaded: to_u64(announce.downloaded),
        left: to_u64(announce.left),
        num_want,
        compact: true,
        params: std::collections::HashMap::new(),
    }
}

fn build_announce_response(
    transaction_id: TransactionId,
    response: &chihaya_tracker_core::request::AnnounceResponse,
    address_family: AddressFamily,
) -> Response {
    #[allow(clippy::cast_possible_truncation)]
    let announce_interval = response.interval.as_secs() as i32;

    match address_family {
        AddressFamily::Ipv4 => Response::AnnounceIpv4(AnnounceResponse {
            transaction_id,
            announce_interval,
            leechers: to_i32(response.incomplete),
            seeders: to_i32(response.complete),
            peers: response
                .ipv4_peers
                .iter()
                .filter_map(|peer| match peer.ip() {
                    IpAddr::V4(ip_address) => Some(ResponsePeer {
                        ip_address,
                        port: peer.port(),
                    }),
                    IpAddr::V6(_) => None,
                })
                .collect(),
        }),
        AddressFamily::Ipv6 => Response::AnnounceIpv6(AnnounceResponse {
            transaction_id,
            announce_interval,
            leechers: to_i32(response.incomplete),
            seeders: to_i32(response.complete),
            peers: response
                .ipv6_peers
                .iter()
                .filter_map(|peer| match peer.ip() {
                    IpAddr::V6(ip_address) => Some(ResponsePeer {
                        ip_address,
                        port: peer.port(),
                    }),
                    IpAddr::V4(_) => None,
                })
                .collect(),
        }),
    }
}

fn error_response(transaction_id: TransactionId, message: &str) -> Response {
    Response::Error(ErrorResponse {
        transaction_id,
        message: message.to_owned(),
    })
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

//! The canonical, transport-agnostic request and response model.
//!
//! Frontends translate their wire format into these types before invoking
//! [`Logic`](crate::logic::Logic). Transport-level validation (field lengths,
//! numwant clamping, IP resolution) happens at the frontend parse boundary;
//! by the time a request reaches the hooks it is well formed.
use std::collections::HashMap;
use std::time::Duration;

use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::info_hash::InfoHash;
use chihaya_primitives::peer::Peer;
use chihaya_primitives::swarm_metadata::SwarmMetadata;
use chihaya_primitives::AddressFamily;

/// An announce: a peer reporting its participation in a swarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,

    /// The announcing peer, with its already-resolved endpoint.
    pub peer: Peer,

    pub event: AnnounceEvent,

    /// Total bytes uploaded, as reported by the client.
    pub uploaded: u64,

    /// Total bytes downloaded, as reported by the client.
    pub downloaded: u64,

    /// Bytes left to download. Zero means the peer is a seeder.
    pub left: u64,

    /// Number of peers the client wants back, already clamped to the
    /// frontend's `[0, max_numwant]` range.
    pub num_want: u32,

    /// Whether the client asked for the compact response form. UDP responses
    /// are always compact.
    pub compact: bool,

    /// Extension parameters that are not part of the base protocol, keyed by
    /// query parameter name (e.g. `jwt`).
    pub params: HashMap<String, String>,
}

impl AnnounceRequest {
    /// Whether the announcing peer is a seeder.
    ///
    /// A peer that is stopping is never counted as a seeder, whatever its
    /// `left` value says.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left == 0 && self.event != AnnounceEvent::Stopped
    }

    #[must_use]
    pub fn address_family(&self) -> AddressFamily {
        self.peer.address_family()
    }
}

/// The response to an announce, before transport encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnounceResponse {
    /// Seconds the client should wait before the next announce.
    pub interval: Duration,

    /// Seconds the client must wait before re-announcing.
    pub min_interval: Duration,

    /// Echo of the request's compact flag.
    pub compact: bool,

    /// Number of seeders in the swarm for the announcer's address family.
    pub complete: u32,

    /// Number of leechers in the swarm for the announcer's address family.
    pub incomplete: u32,

    /// IPv4 peers returned to the client.
    pub ipv4_peers: Vec<Peer>,

    /// IPv6 peers returned to the client.
    pub ipv6_peers: Vec<Peer>,
}

/// A scrape: a query of swarm population counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// The infohashes to report on, already truncated to the frontend's
    /// limit.
    pub info_hashes: Vec<InfoHash>,

    /// The address family whose counts are reported. `None` aggregates both
    /// families, which is what the HTTP frontend does.
    pub address_family: Option<AddressFamily>,
}

/// The response to a scrape: per-infohash counts, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapeResponse {
    pub files: Vec<(InfoHash, SwarmMetadata)>,
}

pub mod fixture {
    use std::collections::HashMap;

    use chihaya_primitives::announce_event::AnnounceEvent;
    use chihaya_primitives::info_hash::InfoHash;
    use chihaya_primitives::peer::fixture::PeerBuilder;
    use chihaya_primitives::peer::Peer;

    use super::AnnounceRequest;

    /// Builder for announce requests used in tests across the workspace.
    #[derive(Debug)]
    pub struct AnnounceRequestBuilder {
        request: AnnounceRequest,
    }

    impl Default for AnnounceRequestBuilder {
        fn default() -> Self {
            Self {
                request: AnnounceRequest {
                    info_hash: InfoHash([0u8; 20]),
                    peer: PeerBuilder::default().build(),
                    event: AnnounceEvent::None,
                    uploaded: 0,
                    downloaded: 0,
                    left: 0,
                    num_want: 50,
                    compact: true,
                    params: HashMap::new(),
                },
            }
        }
    }

    impl AnnounceRequestBuilder {
        #[must_use]
        pub fn with_info_hash(mut self, info_hash: InfoHash) -> Self {
            self.request.info_hash = info_hash;
            self
        }

        #[must_use]
        pub fn with_peer(mut self, peer: Peer) -> Self {
            self.request.peer = peer;
            self
        }

        #[must_use]
        pub fn with_event(mut self, event: AnnounceEvent) -> Self {
            self.request.event = event;
            self
        }

        #[must_use]
        pub fn with_bytes_left(mut self, left: u64) -> Self {
            self.request.left = left;
            self
        }

        #[must_use]
        pub fn with_num_want(mut self, num_want: u32) -> Self {
            self.request.num_want = num_want;
            self
        }

        #[must_use]
        pub fn with_param(mut self, name: &str, value: &str) -> Self {
            self.request.params.insert(name.to_owned(), value.to_owned());
            self
        }

        #[must_use]
        pub fn build(self) -> AnnounceRequest {
            self.request
        }
    }
}

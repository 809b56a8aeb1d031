//! The built-in response-builder hook. Always the last pre-hook.
use std::sync::Arc;
use std::time::Duration;

use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::swarm_metadata::SwarmMetadata;
use chihaya_primitives::AddressFamily;

use super::Hook;
use crate::error::Error;
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};
use crate::storage::{self, PeerStore};

/// Fills the response from the peer store: intervals, swarm counts and the
/// peer list for announces, per-infohash counts for scrapes.
pub struct ResponseHook {
    announce_interval: Duration,
    min_announce_interval: Duration,
    store: Arc<dyn PeerStore>,
}

impl ResponseHook {
    #[must_use]
    pub fn new(announce_interval: Duration, min_announce_interval: Duration, store: Arc<dyn PeerStore>) -> Self {
        Self {
            announce_interval,
            min_announce_interval,
            store,
        }
    }

    /// Whether the announcer is already stored, from an earlier announce.
    fn announcer_is_stored(&self, request: &AnnounceRequest) -> bool {
        self.store.contains_peer(request.info_hash, &request.peer)
    }

    fn scrape_both_families(&self, info_hash: chihaya_primitives::info_hash::InfoHash) -> SwarmMetadata {
        let v4 = self.store.scrape_swarm(info_hash, AddressFamily::Ipv4);
        let v6 = self.store.scrape_swarm(info_hash, AddressFamily::Ipv6);

        SwarmMetadata {
            complete: v4.complete + v6.complete,
            downloaded: v4.downloaded + v6.downloaded,
            incomplete: v4.incomplete + v6.incomplete,
        }
    }
}

impl Hook for ResponseHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        request: &AnnounceRequest,
        response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        response.interval = self.announce_interval;
        response.min_interval = self.min_announce_interval;
        response.compact = request.compact;

        let metadata = self.store.scrape_swarm(request.info_hash, request.address_family());
        response.complete = metadata.complete;
        response.incomplete = metadata.incomplete;

        // The announcer itself joins the swarm only after the response has
        // been written, so count it here or the first response of a swarm
        // reports it as empty.
        if request.event != AnnounceEvent::Stopped && !self.announcer_is_stored(request) {
            if request.is_seeder() {
                response.complete += 1;
            } else {
                response.incomplete += 1;
            }
        }

        // A swarm that does not exist yet simply has no peers to offer. The
        // announcer itself is added by the swarm-interaction hook afterwards.
        let peers = match self
            .store
            .announce_peers(request.info_hash, request.is_seeder(), request.num_want as usize, &request.peer)
        {
            Ok(peers) => peers,
            Err(storage::Error::ResourceDoesNotExist) => Vec::new(),
        };

        match request.address_family() {
            AddressFamily::Ipv4 => response.ipv4_peers = peers,
            AddressFamily::Ipv6 => response.ipv6_peers = peers,
        }

        Ok(())
    }

    fn handle_scrape(&self, _context: &mut Context, request: &ScrapeRequest, response: &mut ScrapeResponse) -> Result<(), Error> {
        response.files.reserve(request.info_hashes.len());

        for info_hash in &request.info_hashes {
            let metadata = match request.address_family {
                Some(address_family) => self.store.scrape_swarm(*info_hash, address_family),
                None => self.scrape_both_families(*info_hash),
            };

            response.files.push((*info_hash, metadata));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    mod building_announce_responses {
        use chihaya_primitives::peer::fixture::PeerBuilder;

        use crate::logic::tests::sample_logic;
        use crate::request::fixture::AnnounceRequestBuilder;
        use crate::storage::PeerStore;

        #[test]
        fn the_first_announce_of_a_swarm_should_already_count_the_announcer() {
            let (logic, _store) = sample_logic();

            let request = AnnounceRequestBuilder::default().with_bytes_left(0).build();

            let (response, _context) = logic.handle_announce(&request).unwrap();

            assert_eq!(response.complete, 1, "the announcer is the only seeder");
            assert_eq!(response.incomplete, 0);
            assert!(response.ipv4_peers.is_empty());
        }

        #[test]
        fn a_re_announce_should_not_double_count_the_announcer() {
            let (logic, store) = sample_logic();

            let request = AnnounceRequestBuilder::default().with_bytes_left(0).build();

            store.put_seeder(request.info_hash, request.peer);

            let (response, _context) = logic.handle_announce(&request).unwrap();

            assert_eq!(response.complete, 1);
        }

        #[test]
        fn a_stopping_announcer_should_not_be_counted() {
            let (logic, store) = sample_logic();

            let request = AnnounceRequestBuilder::default()
                .with_bytes_left(0)
                .with_event(chihaya_primitives::announce_event::AnnounceEvent::Stopped)
                .build();

            store.put_leecher(
                request.info_hash,
                PeerBuilder::default()
                    .with_peer_id_bytes(b"-qB00000000000000002")
                    .with_ipv4_addr(std::net::Ipv4Addr::new(126, 0, 0, 2), 8080)
                    .build(),
            );

            let (response, _context) = logic.handle_announce(&request).unwrap();

            assert_eq!(response.complete, 0);
            assert_eq!(response.incomplete, 1, "only the remaining leecher");
        }
    }

    mod building_scrape_responses {
        use chihaya_primitives::peer::fixture::PeerBuilder;
        use chihaya_primitives::AddressFamily;

        use crate::logic::tests::sample_logic;
        use crate::request::ScrapeRequest;
        use crate::storage::PeerStore;

        #[test]
        fn an_unknown_swarm_should_scrape_as_zeros_not_as_an_error() {
            let (logic, _store) = sample_logic();

            let request = ScrapeRequest {
                info_hashes: vec!["3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap()],
                address_family: Some(AddressFamily::Ipv4),
            };

            let (response, _context) = logic.handle_scrape(&request).unwrap();

            assert_eq!(response.files.len(), 1);
            assert_eq!(response.files[0].1.complete, 0);
            assert_eq!(response.files[0].1.incomplete, 0);
        }

        #[test]
        fn a_family_less_scrape_should_aggregate_both_families() {
            let (logic, store) = sample_logic();

            let info_hash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap();

            store.put_seeder(info_hash, PeerBuilder::default().build());
            store.put_leecher(
                info_hash,
                PeerBuilder::default()
                    .with_peer_id_bytes(b"-qB00000000000000002")
                    .with_ipv6_addr(std::net::Ipv6Addr::LOCALHOST, 8080)
                    .build(),
            );

            let request = ScrapeRequest {
                info_hashes: vec![info_hash],
                address_family: None,
            };

            let (response, _context) = logic.handle_scrape(&request).unwrap();

            assert_eq!(response.files[0].1.complete, 1);
            assert_eq!(response.files[0].1.incomplete, 1);
        }

        #[test]
        fn the_files_should_keep_the_request_order() {
            let (logic, _store) = sample_logic();

            let first = "1111111111111111111111111111111111111111".parse().unwrap();
            let second = "2222222222222222222222222222222222222222".parse().unwrap();

            let request = ScrapeRequest {
                info_hashes: vec![first, second],
                address_family: Some(AddressFamily::Ipv4),
            };

            let (response, _context) = logic.handle_scrape(&request).unwrap();

            assert_eq!(response.files[0].0, first);
            assert_eq!(response.files[1].0, second);
        }
    }
}

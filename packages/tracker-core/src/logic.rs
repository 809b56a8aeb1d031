//! The request pipeline: ordered pre- and post-hook chains around every
//! announce and scrape.
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::hooks::response::ResponseHook;
use crate::hooks::swarm_interaction::SwarmInteractionHook;
use crate::hooks::Hook;
use crate::request::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};
use crate::storage::PeerStore;

/// Shared state flowing through one request's hook chains.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// When set by a pre-hook, the swarm-interaction hook leaves the peer
    /// store untouched for this request.
    pub skip_swarm_interaction: bool,
}

/// The hook chains and the interval policy.
///
/// Pre-hooks run in order before the response is handed to the frontend; the
/// first error aborts the chain and becomes the client-visible failure.
/// Post-hooks run after the frontend has written the response; their errors
/// are logged and never surface.
///
/// The response-builder hook is always the last pre-hook and the
/// swarm-interaction hook is always the first post-hook, so configured hooks
/// observe the request before the response exists and the response before
/// the store is updated.
pub struct Logic {
    pre_hooks: Vec<Box<dyn Hook>>,
    post_hooks: Vec<Box<dyn Hook>>,
}

impl Logic {
    #[must_use]
    pub fn new(
        announce_interval: Duration,
        min_announce_interval: Duration,
        store: Arc<dyn PeerStore>,
        pre_hooks: Vec<Box<dyn Hook>>,
        post_hooks: Vec<Box<dyn Hook>>,
    ) -> Self {
        let mut pre_hooks = pre_hooks;
        pre_hooks.push(Box::new(ResponseHook::new(
            announce_interval,
            min_announce_interval,
            store.clone(),
        )));

        let mut all_post_hooks: Vec<Box<dyn Hook>> = vec![Box::new(SwarmInteractionHook::new(store))];
        all_post_hooks.extend(post_hooks);

        Self {
            pre_hooks,
            post_hooks: all_post_hooks,
        }
    }

    /// Runs the pre-hook chain for an announce and returns the response to
    /// encode.
    ///
    /// # Errors
    ///
    /// Will return the first pre-hook error; the frontend surfaces it to the
    /// client through the transport's error form.
    pub fn handle_announce(&self, request: &AnnounceRequest) -> Result<(AnnounceResponse, Context), Error> {
        let mut context = Context::default();
        let mut response = AnnounceResponse::default();

        for hook in &self.pre_hooks {
            hook.handle_announce(&mut context, request, &mut response)?;
        }

        Ok((response, context))
    }

    /// Runs the post-hook chain for an announce. Errors are logged, never
    /// returned: by now the client already has its response.
    pub fn after_announce(&self, context: &mut Context, request: &AnnounceRequest, response: &mut AnnounceResponse) {
        for hook in &self.post_hooks {
            if let Err(error) = hook.handle_announce(context, request, response) {
                tracing::error!(%error, info_hash = %request.info_hash, "announce post-hook failed");
            }
        }
    }

    /// Runs the pre-hook chain for a scrape and returns the response to
    /// encode.
    ///
    /// # Errors
    ///
    /// Will return the first pre-hook error; the frontend surfaces it to the
    /// client through the transport's error form.
    pub fn handle_scrape(&self, request: &ScrapeRequest) -> Result<(ScrapeResponse, Context), Error> {
        let mut context = Context::default();
        let mut response = ScrapeResponse::default();

        for hook in &self.pre_hooks {
            hook.handle_scrape(&mut context, request, &mut response)?;
        }

        Ok((response, context))
    }

    /// Runs the post-hook chain for a scrape. Errors are logged, never
    /// returned.
    pub fn after_scrape(&self, context: &mut Context, request: &ScrapeRequest, response: &mut ScrapeResponse) {
        for hook in &self.post_hooks {
            if let Err(error) = hook.handle_scrape(context, request, response) {
                tracing::error!(%error, "scrape post-hook failed");
            }
        }
    }

    /// Stops every hook that holds resources (key refreshers and the like).
    pub fn stop(&self) {
        for hook in self.pre_hooks.iter().chain(self.post_hooks.iter()) {
            hook.stop();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {

    use std::sync::Arc;
    use std::time::Duration;

    use crate::logic::Logic;
    use crate::storage::memory::{MemoryPeerStore, Options};
    use crate::storage::PeerStore;

    pub(crate) fn sample_logic_with_hooks(
        pre_hooks: Vec<Box<dyn crate::hooks::Hook>>,
        post_hooks: Vec<Box<dyn crate::hooks::Hook>>,
    ) -> (Logic, Arc<MemoryPeerStore>) {
        let store = Arc::new(MemoryPeerStore::new(&Options::default()));

        let logic = Logic::new(
            Duration::from_secs(1800),
            Duration::from_secs(900),
            store.clone() as Arc<dyn PeerStore>,
            pre_hooks,
            post_hooks,
        );

        (logic, store)
    }

    pub(crate) fn sample_logic() -> (Logic, Arc<MemoryPeerStore>) {
        sample_logic_with_hooks(vec![], vec![])
    }

    mod announce_pipeline {

        use chihaya_primitives::announce_event::AnnounceEvent;
        use chihaya_primitives::peer::fixture::PeerBuilder;
        use chihaya_primitives::AddressFamily;

        use super::sample_logic;
        use crate::request::fixture::AnnounceRequestBuilder;
        use crate::storage::PeerStore;

        #[test]
        fn the_response_should_carry_the_configured_intervals() {
            let (logic, _store) = sample_logic();

            let request = AnnounceRequestBuilder::default().build();

            let (response, _context) = logic.handle_announce(&request).unwrap();

            assert_eq!(response.interval, std::time::Duration::from_secs(1800));
            assert_eq!(response.min_interval, std::time::Duration::from_secs(900));
        }

        #[test]
        fn an_announce_should_only_update_the_store_in_the_post_chain() {
            let (logic, store) = sample_logic();

            let request = AnnounceRequestBuilder::default().with_bytes_left(0).build();

            let (mut response, mut context) = logic.handle_announce(&request).unwrap();

            // The pre chain reads, it does not write.
            assert_eq!(store.aggregate_swarm_metadata().torrents, 0);

            logic.after_announce(&mut context, &request, &mut response);

            assert_eq!(store.aggregate_swarm_metadata().seeders, 1);
        }

        #[test]
        fn a_full_announce_round_trip_should_make_peers_visible_to_each_other() {
            let (logic, _store) = sample_logic();

            let seeder = PeerBuilder::default().with_peer_id_bytes(b"-qB00000000000000001").build();
            let leecher = PeerBuilder::default()
                .with_peer_id_bytes(b"-qB00000000000000002")
                .with_ipv4_addr(std::net::Ipv4Addr::new(126, 0, 0, 2), 8080)
                .build();

            let seeder_announce = AnnounceRequestBuilder::default().with_peer(seeder).with_bytes_left(0).build();
            let (mut response, mut context) = logic.handle_announce(&seeder_announce).unwrap();
            logic.after_announce(&mut context, &seeder_announce, &mut response);

            let leecher_announce = AnnounceRequestBuilder::default()
                .with_peer(leecher)
                .with_bytes_left(1024)
                .build();
            let (response, mut context) = logic.handle_announce(&leecher_announce).unwrap();

            assert_eq!(response.complete, 1);
            assert!(response.ipv4_peers.contains(&seeder));
            assert!(response.ipv6_peers.is_empty());

            let mut response = response;
            logic.after_announce(&mut context, &leecher_announce, &mut response);
        }

        #[test]
        fn a_stopped_event_should_remove_the_peer_from_the_swarm() {
            let (logic, store) = sample_logic();

            let peer = PeerBuilder::default().build();

            let announce = AnnounceRequestBuilder::default().with_peer(peer).with_bytes_left(0).build();
            let (mut response, mut context) = logic.handle_announce(&announce).unwrap();
            logic.after_announce(&mut context, &announce, &mut response);

            let stop = AnnounceRequestBuilder::default()
                .with_peer(peer)
                .with_bytes_left(0)
                .with_event(AnnounceEvent::Stopped)
                .build();
            let (mut response, mut context) = logic.handle_announce(&stop).unwrap();
            logic.after_announce(&mut context, &stop, &mut response);

            let metadata = store.scrape_swarm(announce.info_hash, AddressFamily::Ipv4);
            assert_eq!((metadata.complete, metadata.incomplete), (0, 0));
            assert_eq!(store.aggregate_swarm_metadata().torrents, 0);
        }

        #[test]
        fn a_completed_event_should_graduate_the_leecher() {
            let (logic, store) = sample_logic();

            let peer = PeerBuilder::default().build();

            let join = AnnounceRequestBuilder::default().with_peer(peer).with_bytes_left(1024).build();
            let (mut response, mut context) = logic.handle_announce(&join).unwrap();
            logic.after_announce(&mut context, &join, &mut response);

            let complete = AnnounceRequestBuilder::default()
                .with_peer(peer)
                .with_bytes_left(0)
                .with_event(AnnounceEvent::Completed)
                .build();
            let (mut response, mut context) = logic.handle_announce(&complete).unwrap();
            logic.after_announce(&mut context, &complete, &mut response);

            let metadata = store.scrape_swarm(join.info_hash, AddressFamily::Ipv4);
            assert_eq!((metadata.complete, metadata.incomplete), (1, 0));
        }
    }

    mod hook_ordering {

        use crate::error::{ClientError, Error};
        use crate::hooks::Hook;
        use crate::logic::tests::sample_logic_with_hooks;
        use crate::logic::Context;
        use crate::request::fixture::AnnounceRequestBuilder;
        use crate::request::{AnnounceRequest, AnnounceResponse};
        use crate::storage::PeerStore;

        struct RejectEverything;

        impl Hook for RejectEverything {
            fn handle_announce(
                &self,
                _context: &mut Context,
                _request: &AnnounceRequest,
                _response: &mut AnnounceResponse,
            ) -> Result<(), Error> {
                Err(ClientError::TorrentNotApproved.into())
            }
        }

        struct MarkDeniable;

        impl Hook for MarkDeniable {
            fn handle_announce(
                &self,
                context: &mut Context,
                _request: &AnnounceRequest,
                _response: &mut AnnounceResponse,
            ) -> Result<(), Error> {
                context.skip_swarm_interaction = true;
                Ok(())
            }
        }

        #[test]
        fn the_first_pre_hook_error_should_abort_the_chain() {
            let (logic, _store) = sample_logic_with_hooks(vec![Box::new(RejectEverything)], vec![]);

            let request = AnnounceRequestBuilder::default().build();

            let error = logic.handle_announce(&request).unwrap_err();

            assert_eq!(error.to_string(), "info hash not approved");
        }

        #[test]
        fn a_skip_marker_in_the_context_should_keep_the_store_untouched() {
            let (logic, store) = sample_logic_with_hooks(vec![Box::new(MarkDeniable)], vec![]);

            let request = AnnounceRequestBuilder::default().with_bytes_left(0).build();

            let (mut response, mut context) = logic.handle_announce(&request).unwrap();
            logic.after_announce(&mut context, &request, &mut response);

            assert_eq!(store.aggregate_swarm_metadata().torrents, 0);
        }
    }
}

//! The built-in swarm-interaction hook. Always the first post-hook.
use std::sync::Arc;

use chihaya_primitives::announce_event::AnnounceEvent;

use super::Hook;
use crate::error::Error;
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};
use crate::storage::PeerStore;

/// Applies the announce to the peer store, after the response has been
/// written.
pub struct SwarmInteractionHook {
    store: Arc<dyn PeerStore>,
}

impl SwarmInteractionHook {
    #[must_use]
    pub fn new(store: Arc<dyn PeerStore>) -> Self {
        Self { store }
    }
}

impl Hook for SwarmInteractionHook {
    fn handle_announce(
        &self,
        context: &mut Context,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        if context.skip_swarm_interaction {
            return Ok(());
        }

        match request.event {
            AnnounceEvent::Stopped => {
                // Deleting a peer that was never stored is a no-op, not a
                // failure: clients stop without having announced first.
                let _ = self.store.delete_seeder(request.info_hash, &request.peer);
                let _ = self.store.delete_leecher(request.info_hash, &request.peer);
            }
            AnnounceEvent::Completed => {
                self.store.graduate_leecher(request.info_hash, request.peer);
            }
            AnnounceEvent::None | AnnounceEvent::Started => {
                if request.left == 0 {
                    self.store.put_seeder(request.info_hash, request.peer);
                } else {
                    self.store.put_leecher(request.info_hash, request.peer);
                }
            }
        }

        Ok(())
    }
}

//! Hooks: the pluggable steps of the request pipeline.
//!
//! A hook sees the request and the response under construction, can mutate
//! the response and the shared [`Context`], and can veto the request by
//! returning an error. The two built-in hooks ([`response`] and
//! [`swarm_interaction`]) are installed by
//! [`Logic::new`](crate::logic::Logic::new); the others are chosen by name in
//! the configuration and built by [`setup`].
use crate::error::Error;
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

pub mod client_approval;
pub mod deniability;
pub mod ip_approval;
pub mod jwt;
pub mod response;
pub mod setup;
pub mod swarm_interaction;
pub mod torrent_approval;
pub mod var_interval;

/// A step in the pre- or post-hook chain.
///
/// Hooks are synchronous: the peer store is lock-based and every other hook
/// works on in-memory state. Hooks holding background resources override
/// [`stop`](Hook::stop).
pub trait Hook: Send + Sync {
    /// Processes an announce.
    ///
    /// # Errors
    ///
    /// Will return an error to veto the request (pre chain) or to have the
    /// failure logged (post chain).
    fn handle_announce(&self, context: &mut Context, request: &AnnounceRequest, response: &mut AnnounceResponse)
        -> Result<(), Error>;

    /// Processes a scrape. Most hooks only act on announces, so the default
    /// lets scrapes pass untouched.
    ///
    /// # Errors
    ///
    /// Will return an error to veto the request (pre chain) or to have the
    /// failure logged (post chain).
    fn handle_scrape(&self, context: &mut Context, request: &ScrapeRequest, response: &mut ScrapeResponse) -> Result<(), Error> {
        let (_, _, _) = (context, request, response);
        Ok(())
    }

    /// Releases background resources. Called once, during shutdown, after
    /// the frontends have stopped accepting requests.
    fn stop(&self) {}
}

impl std::fmt::Debug for dyn Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Hook").finish()
    }
}

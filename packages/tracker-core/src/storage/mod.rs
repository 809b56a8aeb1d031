//! Swarm storage.
//!
//! The [`PeerStore`] trait is the seam between the hook chain and the
//! storage implementation. The in-memory implementation in [`memory`] is the
//! authoritative one; alternative backends only need to satisfy the same
//! contract and register a constructor in the [`Registry`].
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chihaya_clock::clock::StaticTime;
use chihaya_primitives::info_hash::InfoHash;
use chihaya_primitives::peer::Peer;
use chihaya_primitives::swarm_metadata::{AggregateSwarmMetadata, SwarmMetadata};
use chihaya_primitives::{AddressFamily, DurationSinceUnixEpoch};
use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::CurrentClock;

pub mod memory;

/// Errors returned by storage operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The swarm or the peer addressed by the operation is not stored.
    ///
    /// This is not a protocol-level error: the swarm-interaction hook uses
    /// it to tell a no-op delete apart from a real one, and the
    /// response-builder hook maps it to an empty peer list.
    #[error("resource does not exist")]
    ResourceDoesNotExist,
}

/// Thread-safe storage of all swarms.
///
/// A peer occupies at most one of the two sub-collections of a swarm, and a
/// swarm exists only while it holds at least one peer. All operations are
/// constant expected time.
///
/// Every operation panics once [`stop`](PeerStore::stop) has been called;
/// the stop group shuts the store down last, after the frontends and the
/// hook chain.
pub trait PeerStore: Send + Sync + 'static {
    /// Adds or refreshes `peer` in the swarm's seeders.
    fn put_seeder(&self, info_hash: InfoHash, peer: Peer);

    /// Removes `peer` from the swarm's seeders.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ResourceDoesNotExist`] if the swarm or the peer
    /// is not stored.
    fn delete_seeder(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error>;

    /// Adds or refreshes `peer` in the swarm's leechers.
    fn put_leecher(&self, info_hash: InfoHash, peer: Peer);

    /// Removes `peer` from the swarm's leechers.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ResourceDoesNotExist`] if the swarm or the peer
    /// is not stored.
    fn delete_leecher(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error>;

    /// Moves `peer` from the leechers into the seeders, atomically for
    /// observers of the swarm's shard. A peer that was never a leecher is
    /// simply added as a seeder.
    fn graduate_leecher(&self, info_hash: InfoHash, peer: Peer);

    /// Returns up to `num_want` peers from the swarm sharing the announcer's
    /// address family: only leechers when the announcer is a seeder,
    /// otherwise seeders first. The announcer itself is excluded by full
    /// peer-key equality. The iteration order over a swarm is unspecified.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ResourceDoesNotExist`] if the swarm is not
    /// stored.
    fn announce_peers(
        &self,
        info_hash: InfoHash,
        announcer_is_seeder: bool,
        num_want: usize,
        announcer: &Peer,
    ) -> Result<Vec<Peer>, Error>;

    /// Whether the peer currently occupies either sub-collection of the
    /// swarm matching its address family.
    fn contains_peer(&self, info_hash: InfoHash, peer: &Peer) -> bool;

    /// Returns the swarm counts for one address family. An absent swarm
    /// reports zeros.
    fn scrape_swarm(&self, info_hash: InfoHash, address_family: AddressFamily) -> SwarmMetadata;

    /// Returns the totals over every swarm, for the statistics reporter.
    fn aggregate_swarm_metadata(&self) -> AggregateSwarmMetadata;

    /// Deletes every peer last seen at or before `cutoff`, dropping swarms
    /// that become empty. Implementations must not block the whole store:
    /// at most one shard at a time, yielding cooperatively in between so
    /// request traffic is never starved.
    fn collect_garbage(&self, cutoff: DurationSinceUnixEpoch) -> BoxFuture<'_, ()>;

    /// Marks the store as stopped. Any further operation panics.
    fn stop(&self);
}

/// Builds one peer store from the validated storage options.
pub type Constructor = fn(&memory::Options) -> Arc<dyn PeerStore>;

/// The name of the authoritative in-memory driver.
pub const DEFAULT_DRIVER: &str = "memory";

/// Errors raised while resolving a storage driver by name.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("unknown storage driver: {name}")]
    UnknownDriver { name: String },
}

/// The explicit name-to-constructor registry for storage drivers.
///
/// There is no process-global driver registration: the application builds a
/// registry (usually [`Registry::default`]), optionally registers extra
/// backends, and resolves the driver by name when assembling the container.
pub struct Registry {
    constructors: HashMap<&'static str, Constructor>,
}

impl Default for Registry {
    /// A registry with the in-memory driver.
    fn default() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };

        registry.register(DEFAULT_DRIVER, |options| Arc::new(memory::MemoryPeerStore::new(options)));

        registry
    }
}

impl Registry {
    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        self.constructors.insert(name, constructor);
    }

    /// # Errors
    ///
    /// Will return an error if the name is not registered.
    pub fn build(&self, name: &str, options: &memory::Options) -> Result<Arc<dyn PeerStore>, BuildError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| BuildError::UnknownDriver { name: name.to_owned() })?;

        Ok(constructor(options))
    }
}

/// Runs the garbage-collection loop until the token is cancelled.
///
/// Every `gc_interval` it purges peers whose last announce is older than
/// `peer_lifetime`.
pub async fn run_gc_loop(store: Arc<dyn PeerStore>, gc_interval: Duration, peer_lifetime: Duration, halt: CancellationToken) {
    let mut interval = tokio::time::interval(gc_interval);

    // The first tick of a tokio interval completes immediately; consume it
    // so the first pass happens one interval after startup.
    interval.tick().await;

    loop {
        tokio::select! {
            () = halt.cancelled() => {
                tracing::info!("garbage collection loop halting");
                break;
            }
            _ = interval.tick() => {
                let cutoff = CurrentClock::now_sub(&peer_lifetime);
                tracing::debug!(?cutoff, "collecting garbage");
                store.collect_garbage(cutoff).await;
            }
        }
    }
}

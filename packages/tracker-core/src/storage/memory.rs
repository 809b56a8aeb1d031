//! The in-memory peer store.
//!
//! Swarms are spread over `2 × shard_count` shards: the first half holds the
//! IPv4 swarms, the second half the IPv6 swarms. A shard is a swarm map plus
//! its peer counters behind one reader/writer lock, so unrelated swarms never
//! contend and the garbage collector blocks at most one shard at a time.
//!
//! Locks are held only for the duration of a map operation and never across
//! an await point.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chihaya_clock::clock::StaticTime;
use chihaya_configuration::core as config;
use chihaya_configuration::Storage;
use chihaya_primitives::info_hash::InfoHash;
use chihaya_primitives::peer::Peer;
use chihaya_primitives::swarm_metadata::{AggregateSwarmMetadata, SwarmMetadata};
use chihaya_primitives::{AddressFamily, DurationSinceUnixEpoch};
use futures::future::BoxFuture;

use super::{Error, PeerStore};
use crate::CurrentClock;

const STOPPED_MESSAGE: &str = "attempted to interact with stopped tracker storage";
const POISONED_MESSAGE: &str = "a shard lock should not be poisoned";

/// Validated knobs of the in-memory store.
///
/// Building options from the configuration never fails: out-of-range values
/// are logged and replaced with their defaults, so a bad numeric knob cannot
/// keep the tracker from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub shard_count: usize,
    pub gc_interval: Duration,
    pub peer_lifetime: Duration,
    pub prometheus_reporting_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_config(&Storage::default())
    }
}

impl Options {
    #[must_use]
    pub fn from_config(storage: &Storage) -> Self {
        let shard_count = if storage.shard_count == 0 {
            tracing::warn!(
                default = config::DEFAULT_SHARD_COUNT,
                "shard_count must be greater than zero, falling back to the default"
            );
            config::DEFAULT_SHARD_COUNT
        } else {
            storage.shard_count
        };

        let gc_interval = if storage.gc_interval == 0 {
            tracing::warn!(
                default = config::DEFAULT_GC_INTERVAL,
                "gc_interval must be greater than zero, falling back to the default"
            );
            Duration::from_secs(config::DEFAULT_GC_INTERVAL)
        } else {
            storage.gc_interval()
        };

        let peer_lifetime = if storage.peer_lifetime == 0 {
            tracing::warn!(
                default = config::DEFAULT_PEER_LIFETIME,
                "peer_lifetime must be greater than zero, falling back to the default"
            );
            Duration::from_secs(config::DEFAULT_PEER_LIFETIME)
        } else {
            storage.peer_lifetime()
        };

        let prometheus_reporting_interval = if storage.prometheus_reporting_interval == 0 {
            tracing::warn!(
                default = config::DEFAULT_PROMETHEUS_REPORTING_INTERVAL,
                "prometheus_reporting_interval must be greater than zero, falling back to the default"
            );
            Duration::from_secs(config::DEFAULT_PROMETHEUS_REPORTING_INTERVAL)
        } else {
            storage.prometheus_reporting_interval()
        };

        Self {
            shard_count,
            gc_interval,
            peer_lifetime,
            prometheus_reporting_interval,
        }
    }
}

/// A swarm: the two sub-collections of peers sharing one infohash and one
/// address family, keyed by the full peer key and holding the last-seen
/// timestamp.
#[derive(Debug, Default)]
struct Swarm {
    seeders: HashMap<Peer, DurationSinceUnixEpoch>,
    leechers: HashMap<Peer, DurationSinceUnixEpoch>,
}

impl Swarm {
    fn is_empty(&self) -> bool {
        self.seeders.is_empty() && self.leechers.is_empty()
    }
}

/// One shard: its swarms plus the peer counters kept in sync under the
/// writer lock.
#[derive(Debug, Default)]
struct Shard {
    swarms: HashMap<InfoHash, Swarm>,
    num_seeders: usize,
    num_leechers: usize,
}

/// The in-memory [`PeerStore`] implementation.
pub struct MemoryPeerStore {
    shards: Vec<RwLock<Shard>>,
    shard_count: usize,
    stopped: AtomicBool,
}

impl MemoryPeerStore {
    #[must_use]
    pub fn new(options: &Options) -> Self {
        let shards = (0..options.shard_count * 2).map(|_| RwLock::new(Shard::default())).collect();

        Self {
            shards,
            shard_count: options.shard_count,
            stopped: AtomicBool::new(false),
        }
    }

    fn assert_running(&self) {
        assert!(!self.stopped.load(Ordering::SeqCst), "{STOPPED_MESSAGE}");
    }

    /// IPv4 swarms live in the first half of the shard array, IPv6 swarms in
    /// the second half. Within a half the shard is chosen by the big-endian
    /// integer value of the first four infohash bytes.
    fn shard_index(&self, info_hash: &InfoHash, address_family: AddressFamily) -> usize {
        let prefix = u32::from_be_bytes(
            info_hash.0[0..4]
                .try_into()
                .expect("an infohash should have at least four bytes"),
        );

        let index = prefix as usize % self.shard_count;

        match address_family {
            AddressFamily::Ipv4 => index,
            AddressFamily::Ipv6 => index + self.shard_count,
        }
    }

    fn shard_for(&self, info_hash: &InfoHash, address_family: AddressFamily) -> &RwLock<Shard> {
        &self.shards[self.shard_index(info_hash, address_family)]
    }
}

impl PeerStore for MemoryPeerStore {
    fn put_seeder(&self, info_hash: InfoHash, peer: Peer) {
        self.assert_running();

        let mut guard = self.shard_for(&info_hash, peer.address_family()).write().expect(POISONED_MESSAGE);
        let shard = &mut *guard;

        let swarm = shard.swarms.entry(info_hash).or_default();

        if swarm.seeders.insert(peer, CurrentClock::now()).is_none() {
            shard.num_seeders += 1;
        }
    }

    fn delete_seeder(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error> {
        self.assert_running();

        let mut guard = self.shard_for(&info_hash, peer.address_family()).write().expect(POISONED_MESSAGE);
        let shard = &mut *guard;

        let Some(swarm) = shard.swarms.get_mut(&info_hash) else {
            return Err(Error::ResourceDoesNotExist);
        };

        if swarm.seeders.remove(peer).is_none() {
            return Err(Error::ResourceDoesNotExist);
        }

        shard.num_seeders -= 1;

        if swarm.is_empty() {
            shard.swarms.remove(&info_hash);
        }

        Ok(())
    }

    fn put_leecher(&self, info_hash: InfoHash, peer: Peer) {
        self.assert_running();

        let mut guard = self.shard_for(&info_hash, peer.address_family()).write().expect(POISONED_MESSAGE);
        let shard = &mut *guard;

        let swarm = shard.swarms.entry(info_hash).or_default();

        if swarm.leechers.insert(peer, CurrentClock::now()).is_none() {
            shard.num_leechers += 1;
        }
    }

    fn delete_leecher(&self, info_hash: InfoHash, peer: &Peer) -> Result<(), Error> {
        self.assert_running();

        let mut guard = self.shard_for(&info_hash, peer.address_family()).write().expect(POISONED_MESSAGE);
        let shard = &mut *guard;

        let Some(swarm) = shard.swarms.get_mut(&info_hash) else {
            return Err(Error::ResourceDoesNotExist);
        };

        if swarm.leechers.remove(peer).is_none() {
            return Err(Error::ResourceDoesNotExist);
        }

        shard.num_leechers -= 1;

        if swarm.is_empty() {
            shard.swarms.remove(&info_hash);
        }

        Ok(())
    }

    fn graduate_leecher(&self, info_hash: InfoHash, peer: Peer) {
        self.assert_running();

        let mut guard = self.shard_for(&info_hash, peer.address_family()).write().expect(POISONED_MESSAGE);
        let shard = &mut *guard;

        let swarm = shard.swarms.entry(info_hash).or_default();

        if swarm.leechers.remove(&peer).is_some() {
            shard.num_leechers -= 1;
        }

        if swarm.seeders.insert(peer, CurrentClock::now()).is_none() {
            shard.num_seeders += 1;
        }
    }

    fn announce_peers(
        &self,
        info_hash: InfoHash,
        announcer_is_seeder: bool,
        num_want: usize,
        announcer: &Peer,
    ) -> Result<Vec<Peer>, Error> {
        self.assert_running();

        let guard = self
            .shard_for(&info_hash, announcer.address_family())
            .read()
            .expect(POISONED_MESSAGE);

        let Some(swarm) = guard.swarms.get(&info_hash) else {
            return Err(Error::ResourceDoesNotExist);
        };

        let mut peers = Vec::with_capacity(num_want.min(swarm.seeders.len() + swarm.leechers.len()));

        if announcer_is_seeder {
            // Seeders are of no use to each other.
            peers.extend(swarm.leechers.keys().filter(|peer| *peer != announcer).take(num_want));
        } else {
            peers.extend(swarm.seeders.keys().filter(|peer| *peer != announcer).take(num_want));

            let remaining = num_want - peers.len();
            peers.extend(swarm.leechers.keys().filter(|peer| *peer != announcer).take(remaining));
        }

        Ok(peers.into_iter().copied().collect())
    }

    fn contains_peer(&self, info_hash: InfoHash, peer: &Peer) -> bool {
        self.assert_running();

        let guard = self.shard_for(&info_hash, peer.address_family()).read().expect(POISONED_MESSAGE);

        guard
            .swarms
            .get(&info_hash)
            .is_some_and(|swarm| swarm.seeders.contains_key(peer) || swarm.leechers.contains_key(peer))
    }

    fn scrape_swarm(&self, info_hash: InfoHash, address_family: AddressFamily) -> SwarmMetadata {
        self.assert_running();

        let guard = self.shard_for(&info_hash, address_family).read().expect(POISONED_MESSAGE);

        match guard.swarms.get(&info_hash) {
            None => SwarmMetadata::zeroed(),
            Some(swarm) => SwarmMetadata {
                #[allow(clippy::cast_possible_truncation)]
                complete: swarm.seeders.len() as u32,
                downloaded: 0,
                #[allow(clippy::cast_possible_truncation)]
                incomplete: swarm.leechers.len() as u32,
            },
        }
    }

    /// Infohashes are snapshotted per shard under the read lock; each swarm
    /// is then purged under a separate write-lock acquisition with a
    /// cooperative yield in between, so no more than one shard is blocked
    /// at a time. Swarms removed between the snapshot and the purge are
    /// skipped.
    ///
    /// # Panics
    ///
    /// Will panic if the store has been stopped.
    fn collect_garbage(&self, cutoff: DurationSinceUnixEpoch) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for shard in &self.shards {
                self.assert_running();

                let info_hashes: Vec<InfoHash> = {
                    let shard = shard.read().expect(POISONED_MESSAGE);
                    shard.swarms.keys().copied().collect()
                };

                for info_hash in info_hashes {
                    {
                        let mut guard = shard.write().expect(POISONED_MESSAGE);
                        let shard = &mut *guard;

                        if let Some(swarm) = shard.swarms.get_mut(&info_hash) {
                            let seeders_before = swarm.seeders.len();
                            swarm.seeders.retain(|_, last_seen| *last_seen > cutoff);
                            shard.num_seeders -= seeders_before - swarm.seeders.len();

                            let leechers_before = swarm.leechers.len();
                            swarm.leechers.retain(|_, last_seen| *last_seen > cutoff);
                            shard.num_leechers -= leechers_before - swarm.leechers.len();

                            if swarm.is_empty() {
                                shard.swarms.remove(&info_hash);
                            }
                        }
                    }

                    tokio::task::yield_now().await;
                }

                tokio::task::yield_now().await;
            }
        })
    }

    fn aggregate_swarm_metadata(&self) -> AggregateSwarmMetadata {
        self.assert_running();

        let mut totals = AggregateSwarmMetadata::default();

        for shard in &self.shards {
            let shard = shard.read().expect(POISONED_MESSAGE);

            totals.torrents += shard.swarms.len() as u64;
            totals.seeders += shard.num_seeders as u64;
            totals.leechers += shard.num_leechers as u64;
        }

        totals
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {

    use std::net::{Ipv4Addr, Ipv6Addr};

    use chihaya_primitives::info_hash::InfoHash;
    use chihaya_primitives::peer::fixture::PeerBuilder;
    use chihaya_primitives::peer::Peer;

    use crate::storage::memory::{MemoryPeerStore, Options};

    fn sample_info_hash() -> InfoHash {
        "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap()
    }

    fn sample_store() -> MemoryPeerStore {
        MemoryPeerStore::new(&Options::default())
    }

    fn ipv4_seeder() -> Peer {
        PeerBuilder::default()
            .with_peer_id_bytes(b"-qB00000000000000001")
            .with_ipv4_addr(Ipv4Addr::new(126, 0, 0, 1), 8080)
            .build()
    }

    fn ipv4_leecher() -> Peer {
        PeerBuilder::default()
            .with_peer_id_bytes(b"-qB00000000000000002")
            .with_ipv4_addr(Ipv4Addr::new(126, 0, 0, 2), 8080)
            .build()
    }

    fn ipv6_leecher() -> Peer {
        PeerBuilder::default()
            .with_peer_id_bytes(b"-qB00000000000000003")
            .with_ipv6_addr(Ipv6Addr::new(0x6969, 0, 0, 0, 0, 0, 0, 1), 8080)
            .build()
    }

    mod options {
        use chihaya_configuration::core::DEFAULT_SHARD_COUNT;
        use chihaya_configuration::Storage;

        use crate::storage::memory::Options;

        #[test]
        fn a_zero_shard_count_should_fall_back_to_the_default() {
            let storage = Storage {
                shard_count: 0,
                ..Default::default()
            };

            assert_eq!(Options::from_config(&storage).shard_count, DEFAULT_SHARD_COUNT);
        }

        #[test]
        fn zero_intervals_should_fall_back_to_their_defaults() {
            let storage = Storage {
                gc_interval: 0,
                peer_lifetime: 0,
                prometheus_reporting_interval: 0,
                ..Default::default()
            };

            let options = Options::from_config(&storage);

            assert_eq!(options, Options::default());
        }
    }

    mod announcing {
        use chihaya_primitives::AddressFamily;

        use super::{ipv4_leecher, ipv4_seeder, ipv6_leecher, sample_info_hash, sample_store};
        use crate::storage::PeerStore;

        #[test]
        fn a_leecher_and_a_seeder_should_see_each_other_but_not_themselves() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let seeder = ipv4_seeder();
            let leecher = ipv4_leecher();

            store.put_leecher(info_hash, leecher);

            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);
            assert_eq!((metadata.complete, metadata.incomplete), (0, 1));

            store.put_seeder(info_hash, seeder);

            let seen_by_leecher = store.announce_peers(info_hash, false, 50, &leecher).unwrap();
            assert!(seen_by_leecher.contains(&seeder));
            assert!(!seen_by_leecher.contains(&leecher));

            let seen_by_seeder = store.announce_peers(info_hash, true, 50, &seeder).unwrap();
            assert!(seen_by_seeder.contains(&leecher));
            assert!(!seen_by_seeder.contains(&seeder));
        }

        #[test]
        fn a_seeder_should_only_be_offered_leechers() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let first_seeder = ipv4_seeder();
            let second_seeder = super::PeerBuilder::default()
                .with_peer_id_bytes(b"-qB00000000000000009")
                .with_ipv4_addr(std::net::Ipv4Addr::new(126, 0, 0, 9), 8080)
                .build();

            store.put_seeder(info_hash, first_seeder);
            store.put_seeder(info_hash, second_seeder);

            let peers = store.announce_peers(info_hash, true, 50, &first_seeder).unwrap();

            assert!(peers.is_empty());
        }

        #[test]
        fn it_should_never_return_more_peers_than_asked_for() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let announcer = ipv4_leecher();

            for index in 0..10u8 {
                let peer = super::PeerBuilder::default()
                    .with_peer_id_bytes(&{
                        let mut id = *b"-qB0000000000000000\0";
                        id[19] = index;
                        id
                    })
                    .with_ipv4_addr(std::net::Ipv4Addr::new(126, 0, 1, index), 8080)
                    .build();
                store.put_seeder(info_hash, peer);
            }

            let peers = store.announce_peers(info_hash, false, 3, &announcer).unwrap();

            assert_eq!(peers.len(), 3);
        }

        #[test]
        fn announcing_to_an_unknown_swarm_should_report_that_it_does_not_exist() {
            let store = sample_store();

            let result = store.announce_peers(sample_info_hash(), false, 50, &ipv4_leecher());

            assert_eq!(result.unwrap_err(), crate::storage::Error::ResourceDoesNotExist);
        }

        #[test]
        fn ipv4_and_ipv6_swarms_for_the_same_infohash_should_be_disjoint() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let v4_seeder = ipv4_seeder();
            let v6_leecher = ipv6_leecher();

            store.put_seeder(info_hash, v4_seeder);
            store.put_leecher(info_hash, v6_leecher);

            let seen_from_ipv4 = store.announce_peers(info_hash, false, 50, &ipv4_leecher()).unwrap();
            assert!(seen_from_ipv4.contains(&v4_seeder));
            assert!(!seen_from_ipv4.contains(&v6_leecher));

            // The IPv6 swarm holds only the announcer itself.
            let seen_from_ipv6 = store.announce_peers(info_hash, false, 50, &v6_leecher).unwrap();
            assert!(seen_from_ipv6.is_empty());

            let v4_metadata = store.scrape_swarm(info_hash, chihaya_primitives::AddressFamily::Ipv4);
            let v6_metadata = store.scrape_swarm(info_hash, chihaya_primitives::AddressFamily::Ipv6);
            assert_eq!((v4_metadata.complete, v4_metadata.incomplete), (1, 0));
            assert_eq!((v6_metadata.complete, v6_metadata.incomplete), (0, 1));
        }
    }

    mod peer_lifecycle {
        use chihaya_primitives::AddressFamily;

        use super::{ipv4_leecher, ipv4_seeder, sample_info_hash, sample_store};
        use crate::storage::{Error, PeerStore};

        #[test]
        fn the_seeders_and_leechers_sets_should_stay_disjoint_under_graduation() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let peer = ipv4_leecher();

            store.put_leecher(info_hash, peer);
            store.graduate_leecher(info_hash, peer);

            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);

            assert_eq!((metadata.complete, metadata.incomplete), (1, 0));
        }

        #[test]
        fn graduating_a_peer_that_never_was_a_leecher_should_add_it_as_a_seeder() {
            let store = sample_store();
            let info_hash = sample_info_hash();

            store.graduate_leecher(info_hash, ipv4_seeder());

            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);

            assert_eq!((metadata.complete, metadata.incomplete), (1, 0));
        }

        #[test]
        fn re_announcing_a_seeder_should_not_inflate_the_counts() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let seeder = ipv4_seeder();

            store.put_seeder(info_hash, seeder);
            store.put_seeder(info_hash, seeder);

            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);

            assert_eq!(metadata.complete, 1);
        }

        #[test]
        fn deleting_the_last_peer_should_delete_the_swarm() {
            let store = sample_store();
            let info_hash = sample_info_hash();
            let seeder = ipv4_seeder();
            let leecher = ipv4_leecher();

            store.put_seeder(info_hash, seeder);
            store.put_leecher(info_hash, leecher);

            store.delete_leecher(info_hash, &leecher).unwrap();
            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);
            assert_eq!((metadata.complete, metadata.incomplete), (1, 0));

            store.delete_seeder(info_hash, &seeder).unwrap();
            let totals = store.aggregate_swarm_metadata();
            assert_eq!(totals.torrents, 0);
        }

        #[test]
        fn deleting_an_absent_peer_should_report_that_it_does_not_exist() {
            let store = sample_store();
            let info_hash = sample_info_hash();

            assert_eq!(store.delete_seeder(info_hash, &ipv4_seeder()), Err(Error::ResourceDoesNotExist));

            store.put_leecher(info_hash, ipv4_leecher());

            assert_eq!(store.delete_seeder(info_hash, &ipv4_seeder()), Err(Error::ResourceDoesNotExist));
        }

        #[test]
        fn the_aggregate_metadata_should_track_the_maps() {
            let store = sample_store();
            let info_hash = sample_info_hash();

            store.put_seeder(info_hash, ipv4_seeder());
            store.put_leecher(info_hash, ipv4_leecher());
            store.put_leecher(info_hash, super::ipv6_leecher());

            let totals = store.aggregate_swarm_metadata();

            // One IPv4 swarm and one IPv6 swarm.
            assert_eq!(totals.torrents, 2);
            assert_eq!(totals.seeders, 1);
            assert_eq!(totals.leechers, 2);
        }
    }

    mod garbage_collection {
        use std::time::Duration;

        use chihaya_clock::clock::{StaticTime, StoppedTime};
        use chihaya_primitives::AddressFamily;

        use super::{ipv4_leecher, ipv4_seeder, sample_info_hash, sample_store};
        use crate::storage::PeerStore;
        use crate::CurrentClock;

        // The stopped clock is process-global, so the GC behavior is covered
        // by one sequential test.
        #[tokio::test]
        async fn it_should_only_evict_peers_whose_last_announce_is_at_or_before_the_cutoff() {
            let store = sample_store();
            let info_hash = sample_info_hash();

            CurrentClock::local_set(&Duration::from_secs(1_000_000));
            store.put_seeder(info_hash, ipv4_seeder());

            CurrentClock::local_add(&Duration::from_secs(60));
            store.put_leecher(info_hash, ipv4_leecher());

            // A cutoff before every timestamp is a no-op.
            store.collect_garbage(Duration::from_secs(999_999)).await;
            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);
            assert_eq!((metadata.complete, metadata.incomplete), (1, 1));

            // The seeder announced at the cutoff, so it is evicted; the
            // leecher announced after it and stays.
            store.collect_garbage(Duration::from_secs(1_000_000)).await;
            let metadata = store.scrape_swarm(info_hash, AddressFamily::Ipv4);
            assert_eq!((metadata.complete, metadata.incomplete), (0, 1));

            // A cutoff after every timestamp leaves an empty store and the
            // swarm itself is gone.
            store.collect_garbage(Duration::MAX).await;
            assert_eq!(store.aggregate_swarm_metadata().torrents, 0);
        }
    }

    mod stopping {
        use super::{ipv4_seeder, sample_info_hash, sample_store};
        use crate::storage::PeerStore;

        #[test]
        #[should_panic = "stopped tracker storage"]
        fn a_stopped_store_should_refuse_writes() {
            let store = sample_store();

            store.stop();

            store.put_seeder(sample_info_hash(), ipv4_seeder());
        }

        #[test]
        #[should_panic = "stopped tracker storage"]
        fn a_stopped_store_should_refuse_reads() {
            let store = sample_store();

            store.stop();

            let _ = store.scrape_swarm(sample_info_hash(), chihaya_primitives::AddressFamily::Ipv4);
        }
    }
}

//! Core configuration: announce intervals, storage knobs and hook chains.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hook::HookConfig;
use crate::validator::{SemanticValidationError, Validator};

/// Interval, in seconds, that clients are told to wait between announces.
pub const DEFAULT_ANNOUNCE_INTERVAL: u32 = 1800;

/// Minimum interval, in seconds, that clients must respect between announces.
pub const DEFAULT_MIN_ANNOUNCE_INTERVAL: u32 = 900;

/// Core configuration for the tracker.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct Core {
    /// Interval, in seconds, reported to clients in announce responses.
    pub announce_interval: u32,

    /// Minimum interval, in seconds, reported to clients in announce
    /// responses.
    pub min_announce_interval: u32,

    /// Knobs of the in-memory peer storage.
    pub storage: Storage,

    /// Hooks executed before the response is built, in order. The
    /// response-builder hook always runs last in this chain.
    pub prehooks: Vec<HookConfig>,

    /// Hooks executed after the response has been sent, in order. The
    /// swarm-interaction hook always runs first in this chain.
    pub posthooks: Vec<HookConfig>,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
            min_announce_interval: DEFAULT_MIN_ANNOUNCE_INTERVAL,
            storage: Storage::default(),
            prehooks: Vec::new(),
            posthooks: Vec::new(),
        }
    }
}

impl Core {
    #[must_use]
    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.announce_interval))
    }

    #[must_use]
    pub fn min_announce_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.min_announce_interval))
    }
}

impl Validator for Core {
    fn validate(&self) -> Result<(), SemanticValidationError> {
        if self.min_announce_interval > self.announce_interval {
            return Err(SemanticValidationError::MinAnnounceIntervalAboveAnnounceInterval {
                announce_interval: self.announce_interval,
                min_announce_interval: self.min_announce_interval,
            });
        }

        Ok(())
    }
}

/// Knobs of the in-memory peer storage.
///
/// Out-of-range values do not prevent the tracker from starting: the storage
/// falls back to the default for the offending knob and logs it.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct Storage {
    /// Number of shards per address family. Must be greater than zero.
    pub shard_count: usize,

    /// Seconds between garbage-collection passes. Must be greater than zero.
    pub gc_interval: u64,

    /// Seconds after which a peer that has not announced is purged. Must be
    /// greater than zero.
    pub peer_lifetime: u64,

    /// Seconds between aggregations of the storage gauges (torrents,
    /// seeders, leechers).
    pub prometheus_reporting_interval: u64,
}

/// Default number of shards per address family.
pub const DEFAULT_SHARD_COUNT: usize = 1024;

/// Default seconds between garbage-collection passes.
pub const DEFAULT_GC_INTERVAL: u64 = 180;

/// Default seconds after which a silent peer is purged.
pub const DEFAULT_PEER_LIFETIME: u64 = 1800;

/// Default seconds between aggregations of the storage gauges.
pub const DEFAULT_PROMETHEUS_REPORTING_INTERVAL: u64 = 1;

impl Default for Storage {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            gc_interval: DEFAULT_GC_INTERVAL,
            peer_lifetime: DEFAULT_PEER_LIFETIME,
            prometheus_reporting_interval: DEFAULT_PROMETHEUS_REPORTING_INTERVAL,
        }
    }
}

impl Storage {
    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval)
    }

    #[must_use]
    pub fn peer_lifetime(&self) -> Duration {
        Duration::from_secs(self.peer_lifetime)
    }

    #[must_use]
    pub fn prometheus_reporting_interval(&self) -> Duration {
        Duration::from_secs(self.prometheus_reporting_interval)
    }
}

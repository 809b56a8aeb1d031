//! UDP frontend configuration.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http_tracker::{DEFAULT_MAX_NUMWANT, DEFAULT_NUMWANT};
use crate::validator::{SemanticValidationError, Validator};

/// Default maximum number of infohashes accepted in one scrape packet.
/// BEP 15 caps it at 74; the default is deliberately below that.
pub const DEFAULT_MAX_SCRAPE_INFO_HASHES: u8 = 50;

/// Hard cap on infohashes per scrape packet, from the BEP 15 packet size.
pub const MAX_SCRAPE_INFO_HASHES: u8 = 74;

/// Default seconds between connection-ID secret rotations.
pub const DEFAULT_ROTATION_INTERVAL: u64 = 120;

/// Configuration for one UDP frontend.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct UdpTracker {
    /// The address the server will bind to. Use port 0 to bind to a random
    /// free port.
    pub bind_address: SocketAddr,

    /// Server secret the connection IDs are derived from. When absent a
    /// random secret is drawn at startup, which invalidates outstanding
    /// connection IDs on restart.
    pub private_key: Option<String>,

    /// Seconds between connection-ID secret rotations. A connection ID stays
    /// valid for up to two rotation intervals.
    pub rotation_interval: u64,

    /// Seconds of clock drift tolerated when judging connection-ID freshness.
    pub max_clock_skew: u64,

    /// Whether the 4-byte IP field of announce packets is honored. When
    /// disabled the peer address always comes from the packet source.
    pub allow_ip_spoofing: bool,

    /// Whether per-request processing time is recorded in the metrics.
    pub enable_request_timing: bool,

    /// Upper bound applied to the `num_want` field.
    pub max_numwant: u32,

    /// Value used when `num_want` is negative.
    pub default_numwant: u32,

    /// Maximum number of infohashes accepted in one scrape packet.
    pub max_scrape_infohashes: u8,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 6969),
            private_key: None,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            max_clock_skew: 10,
            allow_ip_spoofing: false,
            enable_request_timing: false,
            max_numwant: DEFAULT_MAX_NUMWANT,
            default_numwant: DEFAULT_NUMWANT,
            max_scrape_infohashes: DEFAULT_MAX_SCRAPE_INFO_HASHES,
        }
    }
}

impl UdpTracker {
    #[must_use]
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval)
    }

    #[must_use]
    pub fn max_clock_skew(&self) -> Duration {
        Duration::from_secs(self.max_clock_skew)
    }
}

impl Validator for UdpTracker {
    fn validate(&self) -> Result<(), SemanticValidationError> {
        if self.default_numwant > self.max_numwant {
            return Err(SemanticValidationError::DefaultNumwantAboveMaxNumwant {
                default_numwant: self.default_numwant,
                max_numwant: self.max_numwant,
            });
        }

        if self.max_scrape_infohashes > MAX_SCRAPE_INFO_HASHES {
            return Err(SemanticValidationError::MaxScrapeInfoHashesAboveProtocolCap {
                max_scrape_infohashes: self.max_scrape_infohashes,
            });
        }

        Ok(())
    }
}

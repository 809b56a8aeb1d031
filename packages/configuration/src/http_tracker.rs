//! HTTP frontend configuration.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validator::{SemanticValidationError, Validator};

/// Default maximum number of peers returned on an announce.
pub const DEFAULT_MAX_NUMWANT: u32 = 100;

/// Default number of peers returned when the client does not ask for a
/// specific amount.
pub const DEFAULT_NUMWANT: u32 = 50;

/// Configuration for one HTTP frontend.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct HttpTracker {
    /// The address the server will bind to. Use port 0 to bind to a random
    /// free port.
    pub bind_address: SocketAddr,

    /// Maximum seconds to read the request headers.
    pub read_timeout: u64,

    /// Maximum seconds to write a response.
    pub write_timeout: u64,

    /// Maximum seconds a keep-alive connection may stay idle.
    pub idle_timeout: u64,

    /// Whether the `ip`/`ipv4`/`ipv6` query parameters are honored. When
    /// disabled the peer address always comes from the connection (or the
    /// real-IP header).
    pub allow_ip_spoofing: bool,

    /// Header carrying the original client IP when running behind a reverse
    /// proxy. When set and present, it wins over the socket address.
    pub real_ip_header: Option<String>,

    /// Upper bound applied to the `numwant` query parameter.
    pub max_numwant: u32,

    /// Value used when the `numwant` query parameter is absent.
    pub default_numwant: u32,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 6969),
            read_timeout: 5,
            write_timeout: 5,
            idle_timeout: 30,
            allow_ip_spoofing: false,
            real_ip_header: None,
            max_numwant: DEFAULT_MAX_NUMWANT,
            default_numwant: DEFAULT_NUMWANT,
        }
    }
}

impl HttpTracker {
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }
}

impl Validator for HttpTracker {
    fn validate(&self) -> Result<(), SemanticValidationError> {
        if self.default_numwant > self.max_numwant {
            return Err(SemanticValidationError::DefaultNumwantAboveMaxNumwant {
                default_numwant: self.default_numwant,
                max_numwant: self.max_numwant,
            });
        }

        Ok(())
    }
}

//! Prometheus metrics endpoint configuration.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Configuration for the Prometheus metrics endpoint.
///
/// The endpoint serves `GET /metrics` in the text exposition format and a
/// `GET /health` liveness probe.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct Metrics {
    /// The address the metrics server will bind to.
    pub bind_address: SocketAddr,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6880),
        }
    }
}

//! Resolution of the announcing peer's IP address.
//!
//! Priority:
//!
//! 1. The configured real-IP header, when running behind a reverse proxy.
//! 2. The `ip`/`ipv4`/`ipv6` query parameter, when IP spoofing is allowed.
//! 3. The socket address of the connection.
use std::net::IpAddr;

use axum::http::HeaderMap;
use chihaya_configuration::HttpTracker;

/// Resolves the peer IP for one announce or scrape.
#[must_use]
pub fn resolve(config: &HttpTracker, headers: &HeaderMap, claimed_ip: Option<IpAddr>, connection_ip: IpAddr) -> IpAddr {
    if let Some(header_name) = &config.real_ip_header {
        if let Some(ip) = header_ip(headers, header_name) {
            return ip;
        }
    }

    if config.allow_ip_spoofing {
        if let Some(ip) = claimed_ip {
            return ip;
        }
    }

    connection_ip
}

/// The first valid IP in the configured header. Headers like
/// `X-Forwarded-For` may carry a comma-separated chain; the left-most entry
/// is the original client.
fn header_ip(headers: &HeaderMap, header_name: &str) -> Option<IpAddr> {
    let value = headers.get(header_name)?.to_str().ok()?;

    value.split(',').map(str::trim).find_map(|entry| entry.parse().ok())
}

//! Primitive types shared by the chihaya tracker packages.
//!
//! This package contains the basic types used by both wire protocols and the
//! swarm storage:
//!
//! - [`InfoHash`](info_hash::InfoHash): the 20-byte identifier of a torrent.
//! - [`PeerId`](peer::PeerId) and [`Peer`](peer::Peer): a client instance and
//!   the endpoint it announced.
//! - [`AnnounceEvent`](announce_event::AnnounceEvent): the event carried on
//!   an announce request.
//! - [`SwarmMetadata`](swarm_metadata::SwarmMetadata): the counts returned by
//!   a scrape.
use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;

pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod swarm_metadata;

/// Duration since the Unix Epoch. Used as the last-seen timestamp for peers.
pub type DurationSinceUnixEpoch = Duration;

/// The IP address family of a swarm.
///
/// IPv4 and IPv6 swarms for the same infohash are disjoint. An announce only
/// ever returns peers that share its address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    #[must_use]
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::Ipv4,
            IpAddr::V6(_) => Self::Ipv6,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
        }
    }
}

#[cfg(test)]
mod tests {

    mod address_family {
        use std::net::IpAddr;

        use crate::AddressFamily;

        #[test]
        fn it_should_be_derived_from_an_ip_address() {
            let v4: IpAddr = "126.0.0.1".parse().unwrap();
            let v6: IpAddr = "::1".parse().unwrap();

            assert_eq!(AddressFamily::of(&v4), AddressFamily::Ipv4);
            assert_eq!(AddressFamily::of(&v6), AddressFamily::Ipv6);
        }

        #[test]
        fn an_ipv4_mapped_ipv6_address_should_belong_to_the_ipv6_family() {
            // The mapping is not undone here. Frontends decide whether to
            // canonicalize mapped addresses before building a peer.
            let mapped: IpAddr = "::ffff:126.0.0.1".parse().unwrap();

            assert_eq!(AddressFamily::of(&mapped), AddressFamily::Ipv6);
        }
    }
}

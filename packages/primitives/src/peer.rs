//! Peer types used by the tracker storage and the wire protocols.
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

use crate::AddressFamily;

/// The number of bytes in a peer id.
pub const PEER_ID_BYTES_LEN: usize = 20;

/// ID chosen by a downloader client instance.
///
/// Most clients embed a vendor prefix in the first bytes (the Azureus-style
/// `-xx0000-` convention), which the client-approval hook matches against.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub struct PeerId(pub [u8; PEER_ID_BYTES_LEN]);

impl PeerId {
    /// Returns the lowercase hexadecimal representation.
    ///
    /// # Panics
    ///
    /// Will panic if the fixed-size hex buffer is too small, which cannot
    /// happen for a 20-byte input.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut tmp = [0u8; PEER_ID_BYTES_LEN * 2];
        binascii::bin2hex(&self.0, &mut tmp).expect("it should fit in a 40-byte buffer");
        std::str::from_utf8(&tmp)
            .expect("hex digits should be valid UTF-8")
            .to_owned()
    }

    /// Whether the peer id starts with the given raw prefix bytes.
    #[must_use]
    pub fn has_prefix(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl TryFrom<&[u8]> for PeerId {
    type Error = IdConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PEER_ID_BYTES_LEN] = bytes.try_into().map_err(|_| IdConversionError::InvalidLength {
            location: Location::caller(),
            input_len: bytes.len(),
        })?;

        Ok(Self(bytes))
    }
}

impl Serialize for PeerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

/// Error returned when trying to convert an invalid peer id from another type.
#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("invalid peer id length: got {input_len} in {location}")]
    InvalidLength {
        location: &'static Location<'static>,
        input_len: usize,
    },
}

/// A peer as stored in a swarm: the id it announced plus the endpoint it can
/// be reached on.
///
/// Two peers are *endpoint-equal* when IP and port match. Full equality (the
/// derived one) also requires the peer id to match; the swarm maps are keyed
/// by full equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Peer {
    pub peer_id: PeerId,
    pub peer_addr: SocketAddr,
}

impl Peer {
    #[must_use]
    pub fn new(peer_id: PeerId, peer_addr: SocketAddr) -> Self {
        Self { peer_id, peer_addr }
    }

    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.peer_addr.port()
    }

    #[must_use]
    pub fn address_family(&self) -> AddressFamily {
        AddressFamily::of(&self.peer_addr.ip())
    }

    /// Whether the other peer announced from the same IP and port.
    #[must_use]
    pub fn endpoint_eq(&self, other: &Peer) -> bool {
        self.peer_addr == other.peer_addr
    }

    /// The compact wire encoding: IP bytes followed by the big-endian port.
    ///
    /// 6 bytes for IPv4 peers and 18 bytes for IPv6 peers.
    #[must_use]
    pub fn to_compact_bytes(&self) -> Vec<u8> {
        let mut bytes = match self.peer_addr.ip() {
            IpAddr::V4(ip) => ip.octets().to_vec(),
            IpAddr::V6(ip) => ip.octets().to_vec(),
        };
        bytes.extend_from_slice(&self.peer_addr.port().to_be_bytes());
        bytes
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.peer_id, self.peer_addr)
    }
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    use super::{Peer, PeerId};

    /// Builder for peers used in tests across the workspace.
    #[derive(Debug, PartialEq, Eq)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    peer_id: PeerId(*b"-qB00000000000000000"),
                    peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080),
                },
            }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &PeerId) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_id_bytes(mut self, bytes: &[u8; 20]) -> Self {
            self.peer.peer_id = PeerId(*bytes);
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
            self.peer.peer_addr = peer_addr;
            self
        }

        #[must_use]
        pub fn with_ipv4_addr(mut self, ip: Ipv4Addr, port: u16) -> Self {
            self.peer.peer_addr = SocketAddr::new(IpAddr::V4(ip), port);
            self
        }

        #[must_use]
        pub fn with_ipv6_addr(mut self, ip: Ipv6Addr, port: u16) -> Self {
            self.peer.peer_addr = SocketAddr::new(IpAddr::V6(ip), port);
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }
}

#[cfg(test)]
mod tests {

    mod peer_id {
        use crate::peer::PeerId;

        #[test]
        fn it_should_be_converted_to_a_hex_string() {
            let id = PeerId(*b"-qB00000000000000000");

            assert_eq!(id.to_hex_string(), "2d71423030303030303030303030303030303030");
        }

        #[test]
        fn it_should_match_a_client_prefix() {
            let id = PeerId(*b"-qB00000000000000000");

            assert!(id.has_prefix(b"-qB"));
            assert!(!id.has_prefix(b"-TR"));
        }

        #[test]
        fn it_should_reject_byte_slices_with_the_wrong_length() {
            assert!(PeerId::try_from([0u8; 19].as_slice()).is_err());
            assert!(PeerId::try_from([0u8; 21].as_slice()).is_err());
        }
    }

    mod peer {
        use std::net::{Ipv4Addr, Ipv6Addr};

        use crate::peer::fixture::PeerBuilder;

        #[test]
        fn two_peers_with_the_same_endpoint_but_different_ids_should_be_endpoint_equal_only() {
            let first = PeerBuilder::default().with_peer_id_bytes(b"-qB00000000000000001").build();
            let second = PeerBuilder::default().with_peer_id_bytes(b"-qB00000000000000002").build();

            assert!(first.endpoint_eq(&second));
            assert_ne!(first, second);
        }

        #[test]
        fn an_ipv4_peer_should_have_a_6_byte_compact_encoding() {
            let peer = PeerBuilder::default()
                .with_ipv4_addr(Ipv4Addr::new(126, 0, 0, 1), 0x1f90)
                .build();

            assert_eq!(peer.to_compact_bytes(), vec![126, 0, 0, 1, 0x1f, 0x90]);
        }

        #[test]
        fn an_ipv6_peer_should_have_an_18_byte_compact_encoding() {
            let peer = PeerBuilder::default().with_ipv6_addr(Ipv6Addr::LOCALHOST, 8080).build();

            let bytes = peer.to_compact_bytes();

            assert_eq!(bytes.len(), 18);
            assert_eq!(bytes[15], 1, "the last address byte of ::1 should be 1");
            assert_eq!(&bytes[16..], &8080u16.to_be_bytes());
        }
    }
}

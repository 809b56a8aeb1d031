//! Wire types and functions for the BitTorrent UDP tracker protocol
//! (BEP 15).
//!
//! Every packet starts with the same header: an 8-byte connection ID (the
//! protocol magic on connects), a 4-byte action and a 4-byte transaction ID,
//! all big endian. [`request`] parses client packets, [`response`] writes
//! (and, for clients, parses) server packets.
use std::fmt;

pub mod request;
pub mod response;

pub use request::{AnnounceRequest, ConnectRequest, Request, RequestParseError, ScrapeRequest};
pub use response::{AnnounceResponse, ConnectResponse, ErrorResponse, Response, ResponsePeer, ScrapeResponse};

/// The magic connection ID carried by connect requests.
pub const PROTOCOL_IDENTIFIER: i64 = 0x0417_2710_1980;

/// Action codes of the fixed packet header.
pub mod action {
    pub const CONNECT: i32 = 0;
    pub const ANNOUNCE: i32 = 1;
    pub const SCRAPE: i32 = 2;
    pub const ERROR: i32 = 3;
}

/// The 8-byte token a server hands out on connect and requires on announce
/// and scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub i64);

impl ConnectionId {
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(i64::from_be_bytes(bytes))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The client-chosen ID echoed back in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub i32);

#[cfg(test)]
mod tests {

    mod connection_id {
        use crate::ConnectionId;

        #[test]
        fn it_should_round_trip_through_its_big_endian_bytes() {
            let id = ConnectionId(0x0102_0304_0506_0708);

            assert_eq!(ConnectionId::from_be_bytes(id.to_be_bytes()), id);
        }
    }

    mod protocol_identifier {
        use crate::PROTOCOL_IDENTIFIER;

        #[test]
        fn it_should_be_the_bep_15_magic() {
            assert_eq!(PROTOCOL_IDENTIFIER, 4_497_486_125_440);
        }
    }
}

//! The UDP tracker frontend (BEP 15), built on tokio's [`UdpSocket`].
//!
//! Announce and scrape packets must present a connection ID previously
//! obtained through a connect exchange; [`connection_id`] binds those IDs to
//! the client address and a rotating server secret, so replayed IDs from
//! other addresses fail and stale IDs expire after two rotations.
//!
//! [`UdpSocket`]: tokio::net::UdpSocket
use std::net::SocketAddr;

pub mod connection_id;
pub mod handlers;
pub mod server;

pub use server::{RunningUdpServer, UdpServer};

/// One datagram as received from the socket.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}

//! Server packet writing and parsing.
use std::io::{self, Cursor, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::{action, ConnectionId, TransactionId};

/// A server packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Connect(ConnectResponse),
    AnnounceIpv4(AnnounceResponse<Ipv4Addr>),
    AnnounceIpv6(AnnounceResponse<Ipv6Addr>),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

impl Response {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Response::Connect(response) => response.write_bytes(out),
            Response::AnnounceIpv4(response) => response.write_bytes(out),
            Response::AnnounceIpv6(response) => response.write_bytes(out),
            Response::Scrape(response) => response.write_bytes(out),
            Response::Error(response) => response.write_bytes(out),
        }
    }

    /// Parses a server packet the way a client would. Announce payloads do
    /// not encode their address family, so the caller states which family
    /// the exchange ran over.
    ///
    /// # Errors
    ///
    /// Will return an error if the packet is truncated or the action is
    /// unknown.
    pub fn parse_bytes(bytes: &[u8], ipv4: bool) -> Result<Self, ResponseParseError> {
        let mut cursor = Cursor::new(bytes);

        let action = cursor.read_i32::<NetworkEndian>()?;
        let transaction_id = TransactionId(cursor.read_i32::<NetworkEndian>()?);

        match action {
            action::CONNECT => {
                let connection_id = ConnectionId(cursor.read_i64::<NetworkEndian>()?);
                Ok(Response::Connect(ConnectResponse {
                    transaction_id,
                    connection_id,
                }))
            }
            action::ANNOUNCE => {
                let announce_interval = cursor.read_i32::<NetworkEndian>()?;
                let leechers = cursor.read_i32::<NetworkEndian>()?;
                let seeders = cursor.read_i32::<NetworkEndian>()?;

                if ipv4 {
                    let peers = parse_peers::<Ipv4Addr, 4>(&mut cursor, |bytes| Ipv4Addr::from(*bytes))?;
                    Ok(Response::AnnounceIpv4(AnnounceResponse {
                        transaction_id,
                        announce_interval,
                        leechers,
                        seeders,
                        peers,
                    }))
                } else {
                    let peers = parse_peers::<Ipv6Addr, 16>(&mut cursor, |bytes| Ipv6Addr::from(*bytes))?;
                    Ok(Response::AnnounceIpv6(AnnounceResponse {
                        transaction_id,
                        announce_interval,
                        leechers,
                        seeders,
                        peers,
                    }))
                }
            }
            action::SCRAPE => {
                let mut torrent_stats = Vec::new();

                loop {
                    let seeders = match cursor.read_i32::<NetworkEndian>() {
                        Ok(seeders) => seeders,
                        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => break,
                        Err(error) => return Err(error.into()),
                    };
                    let completed = cursor.read_i32::<NetworkEndian>()?;
                    let leechers = cursor.read_i32::<NetworkEndian>()?;

                    torrent_stats.push(TorrentScrapeStatistics {
                        seeders,
                        completed,
                        leechers,
                    });
                }

                Ok(Response::Scrape(ScrapeResponse {
                    transaction_id,
                    torrent_stats,
                }))
            }
            action::ERROR => {
                let mut message = Vec::new();
                cursor.read_to_end(&mut message)?;

                // The reason string is NUL terminated on the wire.
                if message.last() == Some(&0) {
                    message.pop();
                }

                Ok(Response::Error(ErrorResponse {
                    transaction_id,
                    message: String::from_utf8_lossy(&message).into_owned(),
                }))
            }
            _ => Err(ResponseParseError::InvalidAction { action }),
        }
    }
}

fn parse_peers<I, const N: usize>(
    cursor: &mut Cursor<&[u8]>,
    from_bytes: impl Fn(&[u8; N]) -> I,
) -> Result<Vec<ResponsePeer<I>>, ResponseParseError> {
    let mut peers = Vec::new();

    loop {
        let mut ip_bytes = [0u8; N];
        match cursor.read_exact(&mut ip_bytes) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(error) => return Err(error.into()),
        }

        let port = cursor.read_u16::<NetworkEndian>()?;

        peers.push(ResponsePeer {
            ip_address: from_bytes(&ip_bytes),
            port,
        });
    }

    Ok(peers)
}

/// Errors raised while parsing a server packet.
#[derive(Error, Debug)]
pub enum ResponseParseError {
    #[error("truncated packet: {source}")]
    Truncated {
        #[from]
        source: io::Error,
    },

    #[error("invalid action: {action}")]
    InvalidAction { action: i32 },
}

/// The reply to a connect: the connection ID to use from now on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub transaction_id: TransactionId,
    pub connection_id: ConnectionId,
}

impl ConnectResponse {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i32::<NetworkEndian>(action::CONNECT)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;
        out.write_i64::<NetworkEndian>(self.connection_id.0)?;

        Ok(())
    }
}

/// One peer record of an announce response: IP bytes plus big-endian port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePeer<I> {
    pub ip_address: I,
    pub port: u16,
}

/// The reply to an announce. The peer records are 6 bytes each for IPv4
/// exchanges and 18 bytes each for IPv6 exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse<I> {
    pub transaction_id: TransactionId,
    pub announce_interval: i32,
    pub leechers: i32,
    pub seeders: i32,
    pub peers: Vec<ResponsePeer<I>>,
}

impl AnnounceResponse<Ipv4Addr> {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        self.write_fixed(out)?;

        for peer in &self.peers {
            out.write_all(&peer.ip_address.octets())?;
            out.write_u16::<NetworkEndian>(peer.port)?;
        }

        Ok(())
    }
}

impl AnnounceResponse<Ipv6Addr> {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        self.write_fixed(out)?;

        for peer in &self.peers {
            out.write_all(&peer.ip_address.octets())?;
            out.write_u16::<NetworkEndian>(peer.port)?;
        }

        Ok(())
    }
}

impl<I> AnnounceResponse<I> {
    fn write_fixed(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i32::<NetworkEndian>(action::ANNOUNCE)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;
        out.write_i32::<NetworkEndian>(self.announce_interval)?;
        out.write_i32::<NetworkEndian>(self.leechers)?;
        out.write_i32::<NetworkEndian>(self.seeders)?;

        Ok(())
    }
}

/// Per-torrent counters of a scrape response, 12 bytes each on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorrentScrapeStatistics {
    pub seeders: i32,
    pub completed: i32,
    pub leechers: i32,
}

/// The reply to a scrape: counters in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub transaction_id: TransactionId,
    pub torrent_stats: Vec<TorrentScrapeStatistics>,
}

impl ScrapeResponse {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i32::<NetworkEndian>(action::SCRAPE)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;

        for stats in &self.torrent_stats {
            out.write_i32::<NetworkEndian>(stats.seeders)?;
            out.write_i32::<NetworkEndian>(stats.completed)?;
            out.write_i32::<NetworkEndian>(stats.leechers)?;
        }

        Ok(())
    }
}

/// An error packet: a NUL-terminated UTF-8 reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub transaction_id: TransactionId,
    pub message: String,
}

impl ErrorResponse {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i32::<NetworkEndian>(action::ERROR)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;
        out.write_all(self.message.as_bytes())?;
        out.write_all(&[0])?;

        Ok(())
    }
}

//! Client packet parsing and writing.
use std::io::{self, Cursor, Read, Write};
use std::net::Ipv4Addr;

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::info_hash::{InfoHash, INFO_HASH_BYTES_LEN};
use chihaya_primitives::peer::PeerId;
use thiserror::Error;

use crate::{action, ConnectionId, TransactionId, PROTOCOL_IDENTIFIER};

/// A parsed client packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

/// Error raised while parsing a client packet.
///
/// A *sendable* error carries enough of the header to produce an error
/// packet the client can correlate; an *unsendable* one does not, and the
/// packet is dropped silently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestParseError {
    #[error("{message}")]
    Sendable {
        connection_id: ConnectionId,
        transaction_id: TransactionId,
        message: String,
    },

    #[error("{message}")]
    Unsendable { message: String },
}

impl RequestParseError {
    fn sendable(message: &str, connection_id: ConnectionId, transaction_id: TransactionId) -> Self {
        Self::Sendable {
            connection_id,
            transaction_id,
            message: message.to_owned(),
        }
    }

    fn unsendable(message: &str) -> Self {
        Self::Unsendable {
            message: message.to_owned(),
        }
    }

    fn unsendable_io(error: &io::Error) -> Self {
        Self::Unsendable {
            message: error.to_string(),
        }
    }
}

impl Request {
    /// Parses a client packet, accepting at most `max_scrape_info_hashes`
    /// infohashes per scrape.
    ///
    /// # Errors
    ///
    /// Will return a [`RequestParseError`] if the packet is truncated, the
    /// action is unknown, the connect magic is missing or a field is out of
    /// range.
    pub fn parse_bytes(bytes: &[u8], max_scrape_info_hashes: u8) -> Result<Self, RequestParseError> {
        let action = bytes
            .get(8..12)
            .map(|bytes| i32::from_be_bytes(bytes.try_into().expect("a 4-byte slice")))
            .ok_or_else(|| RequestParseError::unsendable("packet too short for the header"))?;

        let mut cursor = Cursor::new(bytes);

        match action {
            action::CONNECT => {
                let protocol_identifier = cursor.read_i64::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?;
                let _action = cursor.read_i32::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?;
                let transaction_id = TransactionId(
                    cursor.read_i32::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?,
                );

                if protocol_identifier == PROTOCOL_IDENTIFIER {
                    Ok(Request::Connect(ConnectRequest { transaction_id }))
                } else {
                    Err(RequestParseError::unsendable("protocol identifier missing"))
                }
            }
            action::ANNOUNCE => AnnounceRequest::parse_body(&mut cursor),
            action::SCRAPE => ScrapeRequest::parse_body(&mut cursor, max_scrape_info_hashes),
            _ => Err(RequestParseError::unsendable("invalid action")),
        }
    }

    /// Writes the packet the way a client would send it.
    ///
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Request::Connect(request) => request.write_bytes(out),
            Request::Announce(request) => request.write_bytes(out),
            Request::Scrape(request) => request.write_bytes(out),
        }
    }
}

/// The initial handshake packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    pub transaction_id: TransactionId,
}

impl ConnectRequest {
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i64::<NetworkEndian>(PROTOCOL_IDENTIFIER)?;
        out.write_i32::<NetworkEndian>(action::CONNECT)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;

        Ok(())
    }
}

/// An announce packet. Fixed 98-byte layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub downloaded: i64,
    pub left: i64,
    pub uploaded: i64,
    pub event: AnnounceEvent,

    /// IP claimed by the client; zero on the wire means "use the packet
    /// source", which parses as `None`.
    pub ip_address: Option<Ipv4Addr>,

    pub key: u32,

    /// Negative means "give me the default amount".
    pub peers_wanted: i32,

    pub port: u16,
}

impl AnnounceRequest {
    fn parse_body(cursor: &mut Cursor<&[u8]>) -> Result<Request, RequestParseError> {
        let connection_id = ConnectionId(cursor.read_i64::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?);
        let _action = cursor.read_i32::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?;
        let transaction_id = TransactionId(cursor.read_i32::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?);

        let truncated = |_: io::Error| RequestParseError::sendable("announce packet too short", connection_id, transaction_id);

        let mut info_hash = [0u8; INFO_HASH_BYTES_LEN];
        cursor.read_exact(&mut info_hash).map_err(truncated)?;

        let mut peer_id = [0u8; 20];
        cursor.read_exact(&mut peer_id).map_err(truncated)?;

        let downloaded = cursor.read_i64::<NetworkEndian>().map_err(truncated)?;
        let left = cursor.read_i64::<NetworkEndian>().map_err(truncated)?;
        let uploaded = cursor.read_i64::<NetworkEndian>().map_err(truncated)?;

        let raw_event = cursor.read_i32::<NetworkEndian>().map_err(truncated)?;
        let event = AnnounceEvent::from_i32(raw_event)
            .map_err(|_| RequestParseError::sendable("invalid announce event", connection_id, transaction_id))?;

        let raw_ip = cursor.read_u32::<NetworkEndian>().map_err(truncated)?;
        let ip_address = if raw_ip == 0 { None } else { Some(Ipv4Addr::from(raw_ip)) };

        let key = cursor.read_u32::<NetworkEndian>().map_err(truncated)?;
        let peers_wanted = cursor.read_i32::<NetworkEndian>().map_err(truncated)?;
        let port = cursor.read_u16::<NetworkEndian>().map_err(truncated)?;

        Ok(Request::Announce(AnnounceRequest {
            connection_id,
            transaction_id,
            info_hash: InfoHash(info_hash),
            peer_id: PeerId(peer_id),
            downloaded,
            left,
            uploaded,
            event,
            ip_address,
            key,
            peers_wanted,
            port,
        }))
    }

    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i64::<NetworkEndian>(self.connection_id.0)?;
        out.write_i32::<NetworkEndian>(action::ANNOUNCE)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;
        out.write_all(&self.info_hash.0)?;
        out.write_all(&self.peer_id.0)?;
        out.write_i64::<NetworkEndian>(self.downloaded)?;
        out.write_i64::<NetworkEndian>(self.left)?;
        out.write_i64::<NetworkEndian>(self.uploaded)?;
        out.write_i32::<NetworkEndian>(self.event.to_i32())?;
        out.write_u32::<NetworkEndian>(self.ip_address.map_or(0, u32::from))?;
        out.write_u32::<NetworkEndian>(self.key)?;
        out.write_i32::<NetworkEndian>(self.peers_wanted)?;
        out.write_u16::<NetworkEndian>(self.port)?;

        Ok(())
    }
}

/// A scrape packet: the header followed by 20-byte infohashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hashes: Vec<InfoHash>,
}

impl ScrapeRequest {
    fn parse_body(cursor: &mut Cursor<&[u8]>, max_scrape_info_hashes: u8) -> Result<Request, RequestParseError> {
        let connection_id = ConnectionId(cursor.read_i64::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?);
        let _action = cursor.read_i32::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?;
        let transaction_id = TransactionId(cursor.read_i32::<NetworkEndian>().map_err(|e| RequestParseError::unsendable_io(&e))?);

        #[allow(clippy::cast_possible_truncation)]
        let position = cursor.position() as usize;
        let remaining = &cursor.get_ref()[position..];

        if remaining.is_empty() || remaining.len() % INFO_HASH_BYTES_LEN != 0 {
            return Err(RequestParseError::sendable(
                "invalid info hash list; full scrapes are not allowed",
                connection_id,
                transaction_id,
            ));
        }

        let info_hashes = remaining
            .chunks_exact(INFO_HASH_BYTES_LEN)
            .take(usize::from(max_scrape_info_hashes))
            .map(|chunk| InfoHash::try_from(chunk).expect("an exact 20-byte chunk"))
            .collect();

        Ok(Request::Scrape(ScrapeRequest {
            connection_id,
            transaction_id,
            info_hashes,
        }))
    }

    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write_bytes(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_i64::<NetworkEndian>(self.connection_id.0)?;
        out.write_i32::<NetworkEndian>(action::SCRAPE)?;
        out.write_i32::<NetworkEndian>(self.transaction_id.0)?;

        for info_hash in &self.info_hashes {
            out.write_all(&info_hash.0)?;
        }

        Ok(())
    }
}

//! The `announce` request.
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::info_hash::InfoHash;
use chihaya_primitives::peer::PeerId;
use thiserror::Error;

use crate::v1::query::Query;

/// Query parameters that belong to the base announce protocol. Anything
/// else is collected as an extension parameter.
const BASE_PARAMS: &[&str] = &[
    "info_hash",
    "peer_id",
    "port",
    "uploaded",
    "downloaded",
    "left",
    "numwant",
    "compact",
    "event",
    "ip",
    "ipv4",
    "ipv6",
    "no_peer_id",
    "key",
];

/// A parsed announce request, before the client IP is resolved and the
/// numwant policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub port: u16,
    pub uploaded: Option<u64>,
    pub downloaded: Option<u64>,
    pub left: Option<u64>,
    pub event: Option<AnnounceEvent>,
    pub compact: Option<bool>,
    pub numwant: Option<u32>,

    /// IP claimed by the client through `ip`, `ipv4` or `ipv6`. Only honored
    /// when the frontend allows IP spoofing.
    pub claimed_ip: Option<IpAddr>,

    /// Extension parameters with UTF-8 values (e.g. `jwt`), keyed by name.
    pub params: HashMap<String, String>,
}

/// Errors raised while parsing an announce query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAnnounceError {
    #[error("missing param {name}")]
    MissingParam { name: &'static str },

    #[error("invalid param value {name}")]
    InvalidParam { name: &'static str },

    #[error("invalid param value info_hash: expected 20 bytes, got {len}")]
    InvalidInfoHashLength { len: usize },

    #[error("invalid param value peer_id: expected 20 bytes, got {len}")]
    InvalidPeerIdLength { len: usize },
}

impl TryFrom<&Query> for Announce {
    type Error = ParseAnnounceError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        let raw_info_hash = query.get_first("info_hash").ok_or(ParseAnnounceError::MissingParam {
            name: "info_hash",
        })?;
        let info_hash =
            InfoHash::try_from(raw_info_hash).map_err(|_| ParseAnnounceError::InvalidInfoHashLength {
                len: raw_info_hash.len(),
            })?;

        let raw_peer_id = query.get_first("peer_id").ok_or(ParseAnnounceError::MissingParam {
            name: "peer_id",
        })?;
        let peer_id = PeerId::try_from(raw_peer_id).map_err(|_| ParseAnnounceError::InvalidPeerIdLength {
            len: raw_peer_id.len(),
        })?;

        let port = require_number::<u16>(query, "port")?;

        let uploaded = optional_number::<u64>(query, "uploaded")?;
        let downloaded = optional_number::<u64>(query, "downloaded")?;
        let left = optional_number::<u64>(query, "left")?;
        let numwant = optional_number::<u32>(query, "numwant")?;

        let event = match query.get_first_str("event") {
            None => None,
            Some(raw) => Some(AnnounceEvent::from_str(raw).map_err(|_| ParseAnnounceError::InvalidParam { name: "event" })?),
        };

        let compact = match query.get_first_str("compact") {
            None => None,
            Some("0") => Some(false),
            Some("1") => Some(true),
            Some(_) => return Err(ParseAnnounceError::InvalidParam { name: "compact" }),
        };

        let claimed_ip = parse_claimed_ip(query)?;

        let params = query
            .iter_utf8()
            .filter(|(name, _)| !BASE_PARAMS.contains(name))
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();

        Ok(Self {
            info_hash,
            peer_id,
            port,
            uploaded,
            downloaded,
            left,
            event,
            compact,
            numwant,
            claimed_ip,
            params,
        })
    }
}

fn require_number<T: FromStr>(query: &Query, name: &'static str) -> Result<T, ParseAnnounceError> {
    optional_number(query, name)?.ok_or(ParseAnnounceError::MissingParam { name })
}

fn optional_number<T: FromStr>(query: &Query, name: &'static str) -> Result<Option<T>, ParseAnnounceError> {
    match query.get_first_str(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ParseAnnounceError::InvalidParam { name }),
    }
}

/// `ip` accepts either family; `ipv4`/`ipv6` must parse to their own family.
fn parse_claimed_ip(query: &Query) -> Result<Option<IpAddr>, ParseAnnounceError> {
    if let Some(raw) = query.get_first_str("ip") {
        let ip = raw.parse().map_err(|_| ParseAnnounceError::InvalidParam { name: "ip" })?;
        return Ok(Some(ip));
    }

    if let Some(raw) = query.get_first_str("ipv4") {
        let ip: IpAddr = raw.parse().map_err(|_| ParseAnnounceError::InvalidParam { name: "ipv4" })?;
        if !ip.is_ipv4() {
            return Err(ParseAnnounceError::InvalidParam { name: "ipv4" });
        }
        return Ok(Some(ip));
    }

    if let Some(raw) = query.get_first_str("ipv6") {
        let ip: IpAddr = raw.parse().map_err(|_| ParseAnnounceError::InvalidParam { name: "ipv6" })?;
        if !ip.is_ipv6() {
            return Err(ParseAnnounceError::InvalidParam { name: "ipv6" });
        }
        return Ok(Some(ip));
    }

    Ok(None)
}

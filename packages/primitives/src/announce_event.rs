//! The event carried on an announce request.
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// The event reported by a peer on an announce.
///
/// The numeric codes are the ones used on the wire by the UDP protocol
/// (BEP 15). The string forms are the ones used by the HTTP query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceEvent {
    /// A regular, periodic announce.
    None,
    /// The peer finished downloading and became a seeder.
    Completed,
    /// The peer joined the swarm.
    Started,
    /// The peer left the swarm. Its entry must be removed.
    Stopped,
}

impl AnnounceEvent {
    /// The BEP 15 numeric code for the event.
    #[must_use]
    pub fn to_i32(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Completed => 1,
            Self::Started => 2,
            Self::Stopped => 3,
        }
    }

    /// Builds the event from its BEP 15 numeric code.
    ///
    /// # Errors
    ///
    /// Will return an error if the code is not in `0..=3`.
    pub fn from_i32(code: i32) -> Result<Self, ParseAnnounceEventError> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Completed),
            2 => Ok(Self::Started),
            3 => Ok(Self::Stopped),
            _ => Err(ParseAnnounceEventError::UnknownCode { code }),
        }
    }
}

impl fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Completed => write!(f, "completed"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

impl FromStr for AnnounceEvent {
    type Err = ParseAnnounceEventError;

    /// An absent or empty `event` query parameter means a regular announce.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "completed" => Ok(Self::Completed),
            "started" => Ok(Self::Started),
            "stopped" => Ok(Self::Stopped),
            _ => Err(ParseAnnounceEventError::UnknownEvent { raw: raw.to_owned() }),
        }
    }
}

/// Error returned when an announce event cannot be recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAnnounceEventError {
    #[error("unknown event: {raw}")]
    UnknownEvent { raw: String },

    #[error("unknown event code: {code}")]
    UnknownCode { code: i32 },
}

//! The 20-byte identifier of a torrent.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::str::FromStr;

use serde::ser::{Serialize, Serializer};
use thiserror::Error;

/// The number of bytes in an infohash.
pub const INFO_HASH_BYTES_LEN: usize = 20;

/// `BitTorrent` infohash: the SHA-1 digest of the `info` dictionary of a
/// torrent file.
///
/// Equality and hashing are by raw bytes.
///
/// ```rust
/// use chihaya_primitives::info_hash::InfoHash;
///
/// let info_hash: InfoHash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap();
///
/// assert_eq!(info_hash.to_string(), "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0");
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct InfoHash(pub [u8; INFO_HASH_BYTES_LEN]);

impl InfoHash {
    /// Returns the raw bytes of the infohash.
    #[must_use]
    pub fn bytes(&self) -> [u8; INFO_HASH_BYTES_LEN] {
        self.0
    }

    /// Returns the lowercase hexadecimal representation.
    ///
    /// # Panics
    ///
    /// Will panic if the fixed-size hex buffer is too small, which cannot
    /// happen for a 20-byte input.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut tmp = [0u8; INFO_HASH_BYTES_LEN * 2];
        binascii::bin2hex(&self.0, &mut tmp).expect("it should fit in a 40-byte buffer");
        std::str::from_utf8(&tmp)
            .expect("hex digits should be valid UTF-8")
            .to_owned()
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl Hash for InfoHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl FromStr for InfoHash {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != INFO_HASH_BYTES_LEN * 2 {
            return Err(ConversionError::InvalidLength {
                location: Location::caller(),
                input_len: s.len(),
            });
        }

        let mut bytes = [0u8; INFO_HASH_BYTES_LEN];

        binascii::hex2bin(s.as_bytes(), &mut bytes).map_err(|_| ConversionError::InvalidHexDigits {
            location: Location::caller(),
        })?;

        Ok(Self(bytes))
    }
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; INFO_HASH_BYTES_LEN] = bytes.try_into().map_err(|_| ConversionError::InvalidLength {
            location: Location::caller(),
            input_len: bytes.len(),
        })?;

        Ok(Self(bytes))
    }
}

impl From<[u8; INFO_HASH_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_BYTES_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

/// Error returned when trying to build an infohash from an invalid source.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("invalid infohash length: got {input_len} in {location}")]
    InvalidLength {
        location: &'static Location<'static>,
        input_len: usize,
    },

    #[error("invalid hex digits in infohash in {location}")]
    InvalidHexDigits { location: &'static Location<'static> },
}

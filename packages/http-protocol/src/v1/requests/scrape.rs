//! The `scrape` request.
use chihaya_primitives::info_hash::InfoHash;
use thiserror::Error;

use crate::v1::query::Query;

/// A parsed scrape request: one or more infohashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// Errors raised while parsing a scrape query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseScrapeError {
    #[error("missing param info_hash")]
    MissingInfoHash,

    #[error("invalid param value info_hash: expected 20 bytes, got {len}")]
    InvalidInfoHashLength { len: usize },
}

impl TryFrom<&Query> for Scrape {
    type Error = ParseScrapeError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        let raw_hashes = query.get_all("info_hash");

        if raw_hashes.is_empty() {
            return Err(ParseScrapeError::MissingInfoHash);
        }

        let info_hashes = raw_hashes
            .into_iter()
            .map(|raw| InfoHash::try_from(raw).map_err(|_| ParseScrapeError::InvalidInfoHashLength { len: raw.len() }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { info_hashes })
    }
}

//! Infohash allow/deny-list hook.
use std::collections::HashSet;

use chihaya_primitives::info_hash::InfoHash;
use serde::Deserialize;

use super::setup::SetupError;
use super::Hook;
use crate::error::{ClientError, Error};
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};

/// Options of the [`TorrentApprovalHook`]. Exactly one of the two lists must
/// be given; the infohashes are hex encoded.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Options {
    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub denylist: Vec<String>,
}

enum List {
    Allow(HashSet<InfoHash>),
    Deny(HashSet<InfoHash>),
}

/// Rejects announces for infohashes outside the allowlist (or inside the
/// denylist). Scrapes are unaffected, so population counts stay queryable.
pub struct TorrentApprovalHook {
    list: List,
}

impl TorrentApprovalHook {
    /// # Errors
    ///
    /// Will return an error if both or neither of the lists are configured,
    /// or an entry is not a valid hex infohash.
    pub fn new(options: &Options) -> Result<Self, SetupError> {
        let list = match (options.allowlist.is_empty(), options.denylist.is_empty()) {
            (false, false) => {
                return Err(SetupError::BadOptions {
                    name: "torrent_approval",
                    reason: "allowlist and denylist are mutually exclusive".to_owned(),
                })
            }
            (true, true) => {
                return Err(SetupError::BadOptions {
                    name: "torrent_approval",
                    reason: "either an allowlist or a denylist is required".to_owned(),
                })
            }
            (false, true) => List::Allow(parse_info_hashes(&options.allowlist)?),
            (true, false) => List::Deny(parse_info_hashes(&options.denylist)?),
        };

        Ok(Self { list })
    }
}

fn parse_info_hashes(entries: &[String]) -> Result<HashSet<InfoHash>, SetupError> {
    entries
        .iter()
        .map(|entry| {
            entry.parse::<InfoHash>().map_err(|_| SetupError::BadOptions {
                name: "torrent_approval",
                reason: format!("not a hex infohash: {entry}"),
            })
        })
        .collect()
}

impl Hook for TorrentApprovalHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let approved = match &self.list {
            List::Allow(allowed) => allowed.contains(&request.info_hash),
            List::Deny(denied) => !denied.contains(&request.info_hash),
        };

        if approved {
            Ok(())
        } else {
            Err(ClientError::TorrentNotApproved.into())
        }
    }
}

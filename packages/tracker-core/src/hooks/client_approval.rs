//! Client-ID prefix allow/deny-list hook.
use serde::Deserialize;

use super::setup::SetupError;
use super::Hook;
use crate::error::{ClientError, Error};
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};

/// Options of the [`ClientApprovalHook`]. Exactly one of the two lists must
/// be given. Entries are raw prefix bytes of the peer id, usually the
/// Azureus-style vendor tag (e.g. `-qB`, `-TR`).
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Options {
    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub denylist: Vec<String>,
}

enum List {
    Allow(Vec<Vec<u8>>),
    Deny(Vec<Vec<u8>>),
}

/// Rejects announces from clients whose peer-id prefix is not approved.
pub struct ClientApprovalHook {
    list: List,
}

impl ClientApprovalHook {
    /// # Errors
    ///
    /// Will return an error if both or neither of the lists are configured,
    /// or a prefix is longer than a peer id.
    pub fn new(options: &Options) -> Result<Self, SetupError> {
        let list = match (options.allowlist.is_empty(), options.denylist.is_empty()) {
            (false, false) => {
                return Err(SetupError::BadOptions {
                    name: "client_approval",
                    reason: "allowlist and denylist are mutually exclusive".to_owned(),
                })
            }
            (true, true) => {
                return Err(SetupError::BadOptions {
                    name: "client_approval",
                    reason: "either an allowlist or a denylist is required".to_owned(),
                })
            }
            (false, true) => List::Allow(parse_prefixes(&options.allowlist)?),
            (true, false) => List::Deny(parse_prefixes(&options.denylist)?),
        };

        Ok(Self { list })
    }
}

fn parse_prefixes(entries: &[String]) -> Result<Vec<Vec<u8>>, SetupError> {
    entries
        .iter()
        .map(|entry| {
            if entry.is_empty() || entry.len() > chihaya_primitives::peer::PEER_ID_BYTES_LEN {
                Err(SetupError::BadOptions {
                    name: "client_approval",
                    reason: format!("prefix must be between 1 and 20 bytes: {entry}"),
                })
            } else {
                Ok(entry.as_bytes().to_vec())
            }
        })
        .collect()
}

impl Hook for ClientApprovalHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let peer_id = &request.peer.peer_id;

        let approved = match &self.list {
            List::Allow(allowed) => allowed.iter().any(|prefix| peer_id.has_prefix(prefix)),
            List::Deny(denied) => !denied.iter().any(|prefix| peer_id.has_prefix(prefix)),
        };

        if approved {
            Ok(())
        } else {
            Err(ClientError::ClientNotApproved.into())
        }
    }
}

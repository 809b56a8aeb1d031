//! Announcer IP allow/deny-list hook.
use std::net::IpAddr;

use ipnet::IpNet;
use serde::Deserialize;

use super::setup::SetupError;
use super::Hook;
use crate::error::{ClientError, Error};
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};

/// Options of the [`IpApprovalHook`]. Exactly one of the two lists must be
/// given. Entries are single addresses (`192.0.2.1`, `2001:db8::1`) or CIDR
/// networks (`192.0.2.0/24`, `2001:db8::/32`).
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Options {
    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub denylist: Vec<String>,
}

enum List {
    Allow(Vec<IpNet>),
    Deny(Vec<IpNet>),
}

/// Rejects announces from addresses outside the allowlist (or inside the
/// denylist).
pub struct IpApprovalHook {
    list: List,
}

impl IpApprovalHook {
    /// # Errors
    ///
    /// Will return an error if both or neither of the lists are configured,
    /// or an entry is neither an IP address nor a CIDR network.
    pub fn new(options: &Options) -> Result<Self, SetupError> {
        let list = match (options.allowlist.is_empty(), options.denylist.is_empty()) {
            (false, false) => {
                return Err(SetupError::BadOptions {
                    name: "ip_approval",
                    reason: "allowlist and denylist are mutually exclusive".to_owned(),
                })
            }
            (true, true) => {
                return Err(SetupError::BadOptions {
                    name: "ip_approval",
                    reason: "either an allowlist or a denylist is required".to_owned(),
                })
            }
            (false, true) => List::Allow(parse_networks(&options.allowlist)?),
            (true, false) => List::Deny(parse_networks(&options.denylist)?),
        };

        Ok(Self { list })
    }
}

fn parse_networks(entries: &[String]) -> Result<Vec<IpNet>, SetupError> {
    entries
        .iter()
        .map(|entry| {
            // A bare address is treated as a host network.
            if let Ok(ip) = entry.parse::<IpAddr>() {
                return Ok(IpNet::from(ip));
            }

            entry.parse::<IpNet>().map_err(|_| SetupError::BadOptions {
                name: "ip_approval",
                reason: format!("neither an IP address nor a CIDR network: {entry}"),
            })
        })
        .collect()
}

impl Hook for IpApprovalHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let ip = request.peer.ip();

        let approved = match &self.list {
            List::Allow(allowed) => allowed.iter().any(|net| net.contains(&ip)),
            List::Deny(denied) => !denied.iter().any(|net| net.contains(&ip)),
        };

        if approved {
            Ok(())
        } else {
            Err(ClientError::IpNotApproved.into())
        }
    }
}

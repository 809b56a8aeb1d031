//! Plausible-deniability hook.
//!
//! Injects synthetic peers into announce responses with a configurable
//! probability, so an observer of responses cannot tell which of the
//! returned peers actually announced.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use chihaya_primitives::peer::{Peer, PeerId, PEER_ID_BYTES_LEN};
use chihaya_primitives::AddressFamily;
use rand::Rng;
use serde::Deserialize;

use super::setup::SetupError;
use super::Hook;
use crate::error::Error;
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};

/// Options of the [`DeniabilityHook`].
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Probability that a given response receives synthetic peers.
    pub modify_response_probability: f64,

    /// Upper bound on the number of peers injected per response.
    pub max_random_peers: usize,

    /// Peer-id prefix of the synthetic peers, at most 20 bytes.
    pub prefix: String,

    /// Lowest port assigned to a synthetic peer. Must be non-zero.
    pub min_port: u16,

    /// One past the highest port assigned to a synthetic peer.
    pub max_port: u16,
}

/// Injects synthetic peers into announce responses.
pub struct DeniabilityHook {
    options: Options,
}

impl DeniabilityHook {
    /// # Errors
    ///
    /// Will return an error if the probability, peer count, prefix length or
    /// port range is out of range.
    pub fn new(options: &Options) -> Result<Self, SetupError> {
        if !(options.modify_response_probability > 0.0 && options.modify_response_probability <= 1.0) {
            return Err(SetupError::BadOptions {
                name: "deniability",
                reason: "modify_response_probability must be in (0, 1]".to_owned(),
            });
        }

        if options.max_random_peers == 0 {
            return Err(SetupError::BadOptions {
                name: "deniability",
                reason: "max_random_peers must be greater than zero".to_owned(),
            });
        }

        if options.prefix.is_empty() || options.prefix.len() > PEER_ID_BYTES_LEN {
            return Err(SetupError::BadOptions {
                name: "deniability",
                reason: "prefix must be between 1 and 20 bytes".to_owned(),
            });
        }

        if options.min_port == 0 || options.max_port <= options.min_port {
            return Err(SetupError::BadOptions {
                name: "deniability",
                reason: "the port range must be non-empty and above zero".to_owned(),
            });
        }

        Ok(Self {
            options: options.clone(),
        })
    }

    fn random_peer(&self, address_family: AddressFamily, rng: &mut impl Rng) -> Peer {
        let mut id = [0u8; PEER_ID_BYTES_LEN];
        let prefix = self.options.prefix.as_bytes();
        id[..prefix.len()].copy_from_slice(prefix);
        rng.fill(&mut id[prefix.len()..]);

        let ip = match address_family {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::from(rng.gen::<u32>())),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::from(rng.gen::<u128>())),
        };

        let port = rng.gen_range(self.options.min_port..self.options.max_port);

        Peer::new(PeerId(id), SocketAddr::new(ip, port))
    }
}

impl Hook for DeniabilityHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        request: &AnnounceRequest,
        response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let mut rng = rand::thread_rng();

        if !rng.gen_bool(self.options.modify_response_probability) {
            return Ok(());
        }

        let address_family = request.address_family();
        let count = rng.gen_range(1..=self.options.max_random_peers);

        let peers = match address_family {
            AddressFamily::Ipv4 => &mut response.ipv4_peers,
            AddressFamily::Ipv6 => &mut response.ipv6_peers,
        };

        for _ in 0..count {
            let peer = self.random_peer(address_family, &mut rng);
            let position = rng.gen_range(0..=peers.len());
            peers.insert(position, peer);
        }

        Ok(())
    }
}

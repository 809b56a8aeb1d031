//! The announce response body.
use std::collections::BTreeMap;

use chihaya_primitives::peer::Peer;
use chihaya_tracker_core::request::AnnounceResponse;

use crate::bencode::Value;

/// Renders the bencoded announce response, picking the compact or the
/// dictionary form from the response's compact flag.
#[must_use]
pub fn write(response: &AnnounceResponse) -> Vec<u8> {
    let mut entries = BTreeMap::new();

    entries.insert(b"complete".to_vec(), Value::Integer(i64::from(response.complete)));
    entries.insert(b"incomplete".to_vec(), Value::Integer(i64::from(response.incomplete)));

    #[allow(clippy::cast_possible_wrap)]
    entries.insert(b"interval".to_vec(), Value::Integer(response.interval.as_secs() as i64));
    #[allow(clippy::cast_possible_wrap)]
    entries.insert(b"min interval".to_vec(), Value::Integer(response.min_interval.as_secs() as i64));

    if response.compact {
        entries.insert(b"peers".to_vec(), Value::Bytes(compact_records(&response.ipv4_peers)));
        entries.insert(b"peers6".to_vec(), Value::Bytes(compact_records(&response.ipv6_peers)));
    } else {
        let peers = response
            .ipv4_peers
            .iter()
            .chain(response.ipv6_peers.iter())
            .map(peer_dict)
            .collect::<Vec<_>>();

        entries.insert(b"peers".to_vec(), Value::List(peers));
    }

    Value::Dict(entries).to_bytes()
}

/// Concatenated 6-byte (IPv4) or 18-byte (IPv6) records.
fn compact_records(peers: &[Peer]) -> Vec<u8> {
    let mut records = Vec::new();

    for peer in peers {
        records.extend_from_slice(&peer.to_compact_bytes());
    }

    records
}

fn peer_dict(peer: &Peer) -> Value {
    let mut entries = BTreeMap::new();

    entries.insert(b"peer id".to_vec(), Value::Bytes(peer.peer_id.0.to_vec()));
    entries.insert(b"ip".to_vec(), Value::from(peer.ip().to_string().as_str()));
    entries.insert(b"port".to_vec(), Value::Integer(i64::from(peer.port())));

    Value::Dict(entries)
}

#[cfg(test)]
mod tests {

    use std::time::Duration;

    use chihaya_primitives::peer::fixture::PeerBuilder;
    use chihaya_tracker_core::request::AnnounceResponse;

    fn sample_response(compact: bool) -> AnnounceResponse {
        AnnounceResponse {
            interval: Duration::from_secs(1800),
            min_interval: Duration::from_secs(900),
            compact,
            complete: 1,
            incomplete: 0,
            ipv4_peers: vec![PeerBuilder::default()
                .with_ipv4_addr(std::net::Ipv4Addr::new(126, 0, 0, 1), 0x1f90)
                .build()],
            ipv6_peers: vec![],
        }
    }

    mod compact_form {
        use crate::bencode::Value;
        use crate::v1::responses::announce;

        #[test]
        fn the_peers_key_should_hold_concatenated_6_byte_records() {
            let body = announce::write(&super::sample_response(true));

            let Value::Dict(entries) = Value::from_bytes(&body).unwrap() else {
                panic!("the response should be a dictionary");
            };

            assert_eq!(
                entries.get(b"peers".as_slice()),
                Some(&Value::Bytes(vec![126, 0, 0, 1, 0x1f, 0x90]))
            );
            assert_eq!(entries.get(b"peers6".as_slice()), Some(&Value::Bytes(vec![])));
            assert_eq!(entries.get(b"interval".as_slice()), Some(&Value::Integer(1800)));
            assert_eq!(entries.get(b"min interval".as_slice()), Some(&Value::Integer(900)));
            assert_eq!(entries.get(b"complete".as_slice()), Some(&Value::Integer(1)));
        }
    }

    mod dictionary_form {
        use crate::bencode::Value;
        use crate::v1::responses::announce;

        #[test]
        fn the_peers_key_should_hold_a_list_of_peer_dictionaries() {
            let body = announce::write(&super::sample_response(false));

            let Value::Dict(entries) = Value::from_bytes(&body).unwrap() else {
                panic!("the response should be a dictionary");
            };

            let Some(Value::List(peers)) = entries.get(b"peers".as_slice()) else {
                panic!("peers should be a list");
            };

            assert_eq!(peers.len(), 1);

            let Value::Dict(peer) = &peers[0] else {
                panic!("each peer should be a dictionary");
            };

            assert_eq!(peer.get(b"ip".as_slice()), Some(&Value::from("126.0.0.1")));
            assert_eq!(peer.get(b"port".as_slice()), Some(&Value::Integer(0x1f90)));
            assert!(peer.contains_key(b"peer id".as_slice()));
        }
    }
}

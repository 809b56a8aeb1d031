//! The scrape response body.
use std::collections::BTreeMap;

use chihaya_tracker_core::request::ScrapeResponse;

use crate::bencode::Value;

/// Renders the bencoded scrape response: a `files` dictionary keyed by the
/// raw 20-byte infohashes.
#[must_use]
pub fn write(response: &ScrapeResponse) -> Vec<u8> {
    let mut files = BTreeMap::new();

    for (info_hash, metadata) in &response.files {
        let mut stats = BTreeMap::new();
        stats.insert(b"complete".to_vec(), Value::Integer(i64::from(metadata.complete)));
        stats.insert(b"downloaded".to_vec(), Value::Integer(i64::from(metadata.downloaded)));
        stats.insert(b"incomplete".to_vec(), Value::Integer(i64::from(metadata.incomplete)));

        files.insert(info_hash.bytes().to_vec(), Value::Dict(stats));
    }

    let mut entries = BTreeMap::new();
    entries.insert(b"files".to_vec(), Value::Dict(files));

    Value::Dict(entries).to_bytes()
}

#[cfg(test)]
mod tests {

    mod scrape_response {
        use chihaya_primitives::swarm_metadata::SwarmMetadata;
        use chihaya_tracker_core::request::ScrapeResponse;

        use crate::bencode::Value;
        use crate::v1::responses::scrape;

        #[test]
        fn the_files_dictionary_should_be_keyed_by_the_raw_infohash() {
            let info_hash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap();

            let response = ScrapeResponse {
                files: vec![(info_hash, SwarmMetadata::new(1, 0, 2))],
            };

            let body = scrape::write(&response);

            let Value::Dict(entries) = Value::from_bytes(&body).unwrap() else {
                panic!("the response should be a dictionary");
            };
            let Some(Value::Dict(files)) = entries.get(b"files".as_slice()) else {
                panic!("files should be a dictionary");
            };

            let Some(Value::Dict(stats)) = files.get(&info_hash.bytes().to_vec()) else {
                panic!("the infohash entry should be a dictionary");
            };

            assert_eq!(stats.get(b"complete".as_slice()), Some(&Value::Integer(1)));
            assert_eq!(stats.get(b"incomplete".as_slice()), Some(&Value::Integer(2)));
            assert_eq!(stats.get(b"downloaded".as_slice()), Some(&Value::Integer(0)));
        }
    }
}

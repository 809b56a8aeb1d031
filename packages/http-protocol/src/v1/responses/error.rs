//! The failure response.
//!
//! Failures are bencoded dictionaries with a single `failure reason` key and
//! are served with HTTP status 200, per BitTorrent convention, so standard
//! clients read the body.
use std::collections::BTreeMap;

use crate::bencode::Value;

/// A `failure reason` response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub failure_reason: String,
}

impl Error {
    /// Renders the bencoded body.
    #[must_use]
    pub fn write(&self) -> Vec<u8> {
        let mut entries = BTreeMap::new();
        entries.insert(b"failure reason".to_vec(), Value::from(self.failure_reason.as_str()));

        Value::Dict(entries).to_bytes()
    }
}

#[cfg(test)]
mod tests {

    mod failure_response {
        use crate::v1::responses::error::Error;

        #[test]
        fn it_should_be_a_dictionary_with_a_single_failure_reason_key() {
            let error = Error {
                failure_reason: "info hash not approved".to_owned(),
            };

            assert_eq!(error.write(), b"d14:failure reason22:info hash not approvede".to_vec());
        }
    }
}

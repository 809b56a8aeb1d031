//! URL query-string parsing.
//!
//! Tracker queries are not regular form data: `info_hash` and `peer_id`
//! carry percent-encoded *binary* values, and `info_hash` repeats on
//! scrapes. Parameters are therefore kept as raw byte values in a multimap,
//! and callers choose a binary or UTF-8 view per parameter.
use multimap::MultiMap;
use percent_encoding::percent_decode;
use thiserror::Error;

/// A parsed query string.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: MultiMap<String, Vec<u8>>,
}

impl Query {
    /// Parses the raw query-string part of the URL (without the leading
    /// `?`).
    ///
    /// # Errors
    ///
    /// Will return an error if a parameter name is not valid UTF-8 after
    /// percent decoding.
    pub fn parse(raw_query: &str) -> Result<Self, ParseQueryError> {
        let mut params = MultiMap::new();

        for pair in raw_query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));

            let name = percent_decode(raw_name.as_bytes())
                .decode_utf8()
                .map_err(|_| ParseQueryError::InvalidParamName {
                    raw_name: raw_name.to_owned(),
                })?
                .into_owned();

            let value = percent_decode(raw_value.as_bytes()).collect();

            params.insert(name, value);
        }

        Ok(Self { params })
    }

    /// The first value of a parameter, as raw bytes.
    #[must_use]
    pub fn get_first(&self, name: &str) -> Option<&[u8]> {
        self.params.get(name).map(Vec::as_slice)
    }

    /// The first value of a parameter, as UTF-8. A binary value reads as
    /// absent.
    #[must_use]
    pub fn get_first_str(&self, name: &str) -> Option<&str> {
        self.get_first(name).and_then(|value| std::str::from_utf8(value).ok())
    }

    /// All values of a repeated parameter, in query order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&[u8]> {
        self.params
            .get_vec(name)
            .map(|values| values.iter().map(Vec::as_slice).collect())
            .unwrap_or_default()
    }

    /// Iterates over all parameters with UTF-8 representable values.
    pub fn iter_utf8(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter_all()
            .flat_map(|(name, values)| values.iter().map(move |value| (name, value)))
            .filter_map(|(name, value)| std::str::from_utf8(value).ok().map(|value| (name.as_str(), value)))
    }
}

/// Errors raised while parsing a query string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseQueryError {
    #[error("invalid param name: {raw_name}")]
    InvalidParamName { raw_name: String },
}

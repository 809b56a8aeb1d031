//! Semantic validation of configuration sections.
//!
//! Type errors are caught when the configuration is deserialized. The checks
//! here are for values that parse but make no sense together.
use thiserror::Error;

/// A section that can be semantically validated after loading.
pub trait Validator {
    /// # Errors
    ///
    /// Will return an error if the section holds values that contradict each
    /// other or the protocol.
    fn validate(&self) -> Result<(), SemanticValidationError>;
}

/// Errors found while semantically validating the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticValidationError {
    #[error("min_announce_interval {min_announce_interval} is above announce_interval {announce_interval}")]
    MinAnnounceIntervalAboveAnnounceInterval {
        announce_interval: u32,
        min_announce_interval: u32,
    },

    #[error("default_numwant {default_numwant} is above max_numwant {max_numwant}")]
    DefaultNumwantAboveMaxNumwant { default_numwant: u32, max_numwant: u32 },

    #[error("max_scrape_infohashes {max_scrape_infohashes} is above the BEP 15 cap of 74")]
    MaxScrapeInfoHashesAboveProtocolCap { max_scrape_infohashes: u8 },
}

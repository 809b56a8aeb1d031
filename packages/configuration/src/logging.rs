//! Logging configuration.
use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default)]
pub struct Logging {
    /// Events below this threshold are dropped.
    pub threshold: Threshold,
}

/// The log threshold.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    /// Logging is disabled.
    #[display("off")]
    Off,
    /// Only errors.
    #[display("error")]
    Error,
    /// Errors and warnings.
    #[display("warn")]
    Warn,
    /// Errors, warnings and info messages.
    #[default]
    #[display("info")]
    Info,
    /// Everything but per-packet traces.
    #[display("debug")]
    Debug,
    /// Everything, including per-packet traces.
    #[display("trace")]
    Trace,
}

#[cfg(test)]
mod tests {

    mod threshold {
        use crate::logging::{Logging, Threshold};

        #[test]
        fn it_should_default_to_info() {
            assert_eq!(Logging::default().threshold, Threshold::Info);
        }

        #[test]
        fn it_should_be_parsed_from_its_lowercase_name() {
            let logging: Logging = serde_json::from_str(r#"{"threshold": "debug"}"#).unwrap();

            assert_eq!(logging.threshold, Threshold::Debug);
        }

        #[test]
        fn it_should_be_displayed_as_its_lowercase_name() {
            assert_eq!(Threshold::Warn.to_string(), "warn");
        }
    }
}

//! Configuration data structures for the chihaya tracker.
//!
//! The configuration is loaded from a [YAML](https://yaml.org/) file whose
//! location is given on the command line (`--config`, default
//! `/etc/chihaya.yaml`).
//!
//! Individual options can be overridden with environment variables prefixed
//! with `CHIHAYA_CONFIG_OVERRIDE_`, using `__` as the separator for nested
//! values. For example:
//!
//! ```text
//! CHIHAYA_CONFIG_OVERRIDE_CORE__ANNOUNCE_INTERVAL=900
//! ```
//!
//! When an option is missing from every source the default value is used, so
//! an empty file yields a tracker with no frontends enabled (which is logged
//! as a warning at startup).
//!
//! Sections:
//!
//! - [`Core`]: announce intervals, storage knobs and the hook chains.
//! - [`HttpTracker`] (`[[http_trackers]]`): one entry per HTTP frontend.
//! - [`UdpTracker`] (`[[udp_trackers]]`): one entry per UDP frontend.
//! - [`Metrics`] (`[metrics]`): the Prometheus endpoint.
//! - [`Logging`]: log threshold.
pub mod core;
pub mod hook;
pub mod http_tracker;
pub mod logging;
pub mod metrics;
pub mod udp_tracker;
pub mod validator;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::core::{Core, Storage};
pub use crate::hook::HookConfig;
pub use crate::http_tracker::HttpTracker;
pub use crate::logging::{Logging, Threshold};
pub use crate::metrics::Metrics;
pub use crate::udp_tracker::UdpTracker;
pub use crate::validator::{SemanticValidationError, Validator};

/// Prefix for env vars that overwrite configuration options.
const CONFIG_OVERRIDE_PREFIX: &str = "CHIHAYA_CONFIG_OVERRIDE_";

/// Path separator in env var names for nested values in configuration.
const CONFIG_OVERRIDE_SEPARATOR: &str = "__";

/// Information needed to load the configuration.
#[derive(Debug, Default, Clone)]
pub struct Info {
    /// Path of the YAML configuration file.
    pub config_path: String,
    /// The whole configuration as a YAML string. Takes priority over the
    /// file, used mainly by tests and containerized deployments.
    pub config_yaml: Option<String>,
}

/// The whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct Configuration {
    /// Logging configuration.
    #[serde(default)]
    pub logging: Logging,

    /// Core configuration: intervals, storage and hooks.
    #[serde(default)]
    pub core: Core,

    /// The list of HTTP frontends. Each entry is an HTTP server with its own
    /// bind address and parsing policy.
    #[serde(default)]
    pub http_trackers: Option<Vec<HttpTracker>>,

    /// The list of UDP frontends. Each entry is a UDP server with its own
    /// bind address, connection-ID policy and parsing policy.
    #[serde(default)]
    pub udp_trackers: Option<Vec<UdpTracker>>,

    /// The Prometheus metrics endpoint. Disabled when absent.
    #[serde(default)]
    pub metrics: Option<Metrics>,
}

impl Configuration {
    /// Loads the configuration from the sources described by `info`.
    ///
    /// Priority, highest first: env var overrides, the inline YAML string,
    /// the YAML file, defaults.
    ///
    /// # Errors
    ///
    /// Will return an error if the configuration cannot be parsed or an
    /// option has the wrong type.
    pub fn load(info: &Info) -> Result<Configuration, Error> {
        let figment = if let Some(config_yaml) = &info.config_yaml {
            Figment::from(Yaml::string(config_yaml))
        } else {
            Figment::from(Yaml::file(&info.config_path))
        };

        let figment = figment
            .merge(Env::prefixed(CONFIG_OVERRIDE_PREFIX).split(CONFIG_OVERRIDE_SEPARATOR))
            .join(Serialized::defaults(Configuration::default()));

        let config: Configuration = figment.extract()?;

        Ok(config)
    }
}

impl Validator for Configuration {
    fn validate(&self) -> Result<(), SemanticValidationError> {
        self.core.validate()?;

        if let Some(http_trackers) = &self.http_trackers {
            for http_tracker in http_trackers {
                http_tracker.validate()?;
            }
        }

        if let Some(udp_trackers) = &self.udp_trackers {
            for udp_tracker in udp_trackers {
                udp_tracker.validate()?;
            }
        }

        Ok(())
    }
}

/// Errors that can happen while loading the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("bad configuration: {source}")]
    Figment {
        #[from]
        source: figment::Error,
    },
}

//! Announce-interval jitter hook.
//!
//! Without jitter, the peers of a swarm that appeared together re-announce
//! together forever. This hook smears the reported interval so the load
//! spreads out.
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use super::setup::SetupError;
use super::Hook;
use crate::error::Error;
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};

/// Options of the [`VarIntervalHook`].
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Probability that a given response is modified at all.
    #[serde(default = "default_probability")]
    pub modify_response_probability: f64,

    /// Maximum number of seconds added to the interval.
    pub max_increase_delta: u64,

    /// Whether `min interval` receives the same jitter.
    #[serde(default)]
    pub modify_min_interval: bool,
}

fn default_probability() -> f64 {
    1.0
}

/// Adds a uniform random number of seconds to the announce interval.
pub struct VarIntervalHook {
    options: Options,
}

impl VarIntervalHook {
    /// # Errors
    ///
    /// Will return an error if the delta is zero or the probability is not in
    /// `(0, 1]`.
    pub fn new(options: &Options) -> Result<Self, SetupError> {
        if options.max_increase_delta == 0 {
            return Err(SetupError::BadOptions {
                name: "var_interval",
                reason: "max_increase_delta must be greater than zero".to_owned(),
            });
        }

        if !(options.modify_response_probability > 0.0 && options.modify_response_probability <= 1.0) {
            return Err(SetupError::BadOptions {
                name: "var_interval",
                reason: "modify_response_probability must be in (0, 1]".to_owned(),
            });
        }

        Ok(Self {
            options: options.clone(),
        })
    }
}

impl Hook for VarIntervalHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        _request: &AnnounceRequest,
        response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let mut rng = rand::thread_rng();

        if !rng.gen_bool(self.options.modify_response_probability) {
            return Ok(());
        }

        let delta = Duration::from_secs(rng.gen_range(1..=self.options.max_increase_delta));

        response.interval += delta;

        if self.options.modify_min_interval {
            response.min_interval += delta;
        }

        Ok(())
    }
}

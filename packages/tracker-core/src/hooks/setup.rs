//! Hook construction: resolves configured hook names to constructors.
//!
//! There is no process-global driver registration. The application builds a
//! [`Registry`] (usually [`Registry::default`]), optionally registers extra
//! constructors, and resolves the configured `prehooks`/`posthooks` lists
//! through it.
use std::collections::HashMap;

use chihaya_configuration::HookConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::client_approval::ClientApprovalHook;
use super::deniability::DeniabilityHook;
use super::ip_approval::IpApprovalHook;
use super::jwt::JwtHook;
use super::torrent_approval::TorrentApprovalHook;
use super::var_interval::VarIntervalHook;
use super::Hook;

/// Builds one hook from its configured options.
pub type Constructor = fn(&Value) -> Result<Box<dyn Hook>, SetupError>;

/// Errors raised while building the hook chains from the configuration.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("unknown hook: {name}")]
    UnknownHook { name: String },

    #[error("invalid options for hook {name}: {source}")]
    InvalidOptions {
        name: &'static str,
        source: serde_json::Error,
    },

    #[error("invalid options for hook {name}: {reason}")]
    BadOptions { name: &'static str, reason: String },
}

/// The explicit name-to-constructor registry for pluggable hooks.
pub struct Registry {
    constructors: HashMap<&'static str, Constructor>,
}

impl Default for Registry {
    /// A registry with every built-in pluggable hook.
    fn default() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };

        registry.register("torrent_approval", build_torrent_approval);
        registry.register("client_approval", build_client_approval);
        registry.register("ip_approval", build_ip_approval);
        registry.register("jwt", build_jwt);
        registry.register("var_interval", build_var_interval);
        registry.register("deniability", build_deniability);

        registry
    }
}

impl Registry {
    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        self.constructors.insert(name, constructor);
    }

    /// # Errors
    ///
    /// Will return an error if the name is not registered or the options do
    /// not satisfy the hook.
    pub fn build(&self, config: &HookConfig) -> Result<Box<dyn Hook>, SetupError> {
        let constructor = self.constructors.get(config.name.as_str()).ok_or(SetupError::UnknownHook {
            name: config.name.clone(),
        })?;

        constructor(&config.options)
    }
}

/// Builds a hook chain in configuration order.
///
/// # Errors
///
/// Will return the first construction error.
pub fn build_hooks(configs: &[HookConfig], registry: &Registry) -> Result<Vec<Box<dyn Hook>>, SetupError> {
    configs.iter().map(|config| registry.build(config)).collect()
}

fn parse_options<T: DeserializeOwned>(name: &'static str, value: &Value) -> Result<T, SetupError> {
    // An absent `options` key reaches the constructor as null; treat it as
    // an empty table so hooks see their own "option missing" errors.
    let value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value.clone()
    };

    serde_json::from_value(value).map_err(|source| SetupError::InvalidOptions { name, source })
}

fn build_torrent_approval(options: &Value) -> Result<Box<dyn Hook>, SetupError> {
    let options = parse_options("torrent_approval", options)?;
    Ok(Box::new(TorrentApprovalHook::new(&options)?))
}

fn build_client_approval(options: &Value) -> Result<Box<dyn Hook>, SetupError> {
    let options = parse_options("client_approval", options)?;
    Ok(Box::new(ClientApprovalHook::new(&options)?))
}

fn build_ip_approval(options: &Value) -> Result<Box<dyn Hook>, SetupError> {
    let options = parse_options("ip_approval", options)?;
    Ok(Box::new(IpApprovalHook::new(&options)?))
}

fn build_jwt(options: &Value) -> Result<Box<dyn Hook>, SetupError> {
    let options = parse_options("jwt", options)?;
    Ok(Box::new(JwtHook::new(&options)))
}

fn build_var_interval(options: &Value) -> Result<Box<dyn Hook>, SetupError> {
    let options = parse_options("var_interval", options)?;
    Ok(Box::new(VarIntervalHook::new(&options)?))
}

fn build_deniability(options: &Value) -> Result<Box<dyn Hook>, SetupError> {
    let options = parse_options("deniability", options)?;
    Ok(Box::new(DeniabilityHook::new(&options)?))
}

#[cfg(test)]
mod tests {

    mod hook_registry {
        use chihaya_configuration::HookConfig;
        use serde_json::json;

        use crate::hooks::setup::{build_hooks, Registry, SetupError};

        #[test]
        fn it_should_reject_an_unknown_hook_name() {
            let registry = Registry::default();

            let config = HookConfig {
                name: "no_such_hook".to_owned(),
                options: serde_json::Value::Null,
            };

            let error = registry.build(&config).unwrap_err();

            assert!(matches!(error, SetupError::UnknownHook { .. }));
        }

        #[test]
        fn it_should_build_the_configured_chain_in_order() {
            let registry = Registry::default();

            let configs = vec![
                HookConfig {
                    name: "client_approval".to_owned(),
                    options: json!({"allowlist": ["-qB"]}),
                },
                HookConfig {
                    name: "torrent_approval".to_owned(),
                    options: json!({"denylist": ["3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0"]}),
                },
            ];

            let hooks = build_hooks(&configs, &registry).unwrap();

            assert_eq!(hooks.len(), 2);
        }

        #[test]
        fn a_hook_with_missing_options_should_fail_with_its_own_error() {
            let registry = Registry::default();

            let config = HookConfig {
                name: "torrent_approval".to_owned(),
                options: serde_json::Value::Null,
            };

            let error = registry.build(&config).unwrap_err();

            assert!(error.to_string().contains("either an allowlist or a denylist is required"));
        }

        #[test]
        fn options_with_the_wrong_shape_should_be_rejected() {
            let registry = Registry::default();

            let config = HookConfig {
                name: "var_interval".to_owned(),
                options: json!({"max_increase_delta": "not-a-number"}),
            };

            let error = registry.build(&config).unwrap_err();

            assert!(matches!(error, SetupError::InvalidOptions { .. }));
        }
    }
}

//! Configuration loading and container assembly.
use std::sync::Arc;

use anyhow::Context;
use chihaya_configuration::{Configuration, Info, Validator};
use chihaya_tracker_core::hooks::setup::Registry as HookRegistry;
use chihaya_tracker_core::storage;

use crate::container::AppContainer;

/// Loads the configuration, sets up logging and builds the application
/// container.
///
/// # Errors
///
/// Will return an error if the configuration cannot be loaded, is
/// semantically invalid, or names an unknown hook.
pub fn setup(config_path: &str, debug: bool, json: bool, nocolors: bool) -> anyhow::Result<(Arc<Configuration>, AppContainer)> {
    let info = Info {
        config_path: config_path.to_owned(),
        config_yaml: None,
    };

    let config = Configuration::load(&info).with_context(|| format!("could not load configuration from {config_path}"))?;

    super::logging::setup(config.logging.threshold, debug, json, nocolors);

    config.validate().context("the configuration is semantically invalid")?;

    let config = Arc::new(config);

    let container = AppContainer::initialize(&config, &storage::Registry::default(), &HookRegistry::default())
        .context("could not build the application container")?;

    Ok((config, container))
}

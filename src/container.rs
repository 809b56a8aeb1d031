//! The application container: every long-lived service, built once from the
//! configuration.
use std::sync::Arc;

use anyhow::Context;
use chihaya_configuration::Configuration;
use chihaya_tracker_core::hooks::setup::{build_hooks, Registry as HookRegistry};
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::statistics::TrackerMetrics;
use chihaya_tracker_core::storage;
use chihaya_tracker_core::storage::memory::Options;
use chihaya_tracker_core::storage::PeerStore;

/// The assembled application services.
pub struct AppContainer {
    pub config: Arc<Configuration>,
    pub storage_options: Options,
    pub store: Arc<dyn PeerStore>,
    pub logic: Arc<Logic>,
    pub metrics: Arc<TrackerMetrics>,
}

impl AppContainer {
    /// Builds the peer store and the hook chains from the configuration,
    /// resolving the storage driver and the hook names through the given
    /// registries. Must be called from within a tokio runtime (some hooks
    /// spawn background tasks).
    ///
    /// # Errors
    ///
    /// Will return an error if the storage driver cannot be resolved, a
    /// configured hook is unknown, or hook options are invalid.
    pub fn initialize(
        config: &Arc<Configuration>,
        storage_registry: &storage::Registry,
        hook_registry: &HookRegistry,
    ) -> anyhow::Result<Self> {
        let storage_options = Options::from_config(&config.core.storage);

        let store = storage_registry
            .build(storage::DEFAULT_DRIVER, &storage_options)
            .context("could not build the peer store")?;

        let pre_hooks = build_hooks(&config.core.prehooks, hook_registry).context("could not build the pre-hook chain")?;
        let post_hooks = build_hooks(&config.core.posthooks, hook_registry).context("could not build the post-hook chain")?;

        let logic = Arc::new(Logic::new(
            config.core.announce_interval(),
            config.core.min_announce_interval(),
            store.clone(),
            pre_hooks,
            post_hooks,
        ));

        Ok(Self {
            config: config.clone(),
            storage_options,
            store,
            logic,
            metrics: Arc::new(TrackerMetrics::default()),
        })
    }

    /// Stops the request pipeline and then the store, in dependency order.
    /// The frontends must have been stopped already.
    pub fn stop(&self) {
        self.logic.stop();
        self.store.stop();
    }
}

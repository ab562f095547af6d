use std::collections::BTreeMap;
use std::sync::Arc;

use vitrine_core::{ConfigError, Platform};
use vitrine_scraper::PlatformAdapter;

/// The adapters an orchestrator can dispatch to, one per platform.
#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Platform, Arc<PlatformAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under its own platform, replacing any previous one.
    #[must_use]
    pub fn with_adapter(mut self, adapter: PlatformAdapter) -> Self {
        self.adapters.insert(adapter.platform(), Arc::new(adapter));
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedPlatform`] when no adapter is
    /// registered for `platform`.
    pub fn get(&self, platform: Platform) -> Result<&PlatformAdapter, ConfigError> {
        self.adapters
            .get(&platform)
            .map(AsRef::as_ref)
            .ok_or(ConfigError::UnsupportedPlatform(platform))
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.adapters.keys().copied().collect()
    }
}

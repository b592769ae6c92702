//! Thread-safe configuration caching with arc-swap for lock-free reads.

use crate::loader::ConfigError;
use crate::schema::Config;
use crate::validator::ConfigValidator;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Thread-safe configuration cache using arc-swap for lock-free reads.
#[derive(Debug)]
pub struct ConfigCache {
    config: ArcSwap<Config>,
}

impl ConfigCache {
    /// Creates a new configuration cache with the given initial configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Gets the current configuration.
    pub fn get(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Replaces the configuration atomically if it validates.
    ///
    /// On failure the previous snapshot stays current.
    pub fn update(&self, config: Config) -> Result<(), ConfigError> {
        ConfigValidator::validate(&config)?;
        self.config.store(Arc::new(config));
        Ok(())
    }

    /// Applies `f` to a copy of the current configuration and stores the
    /// result if it validates.
    pub fn modify<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let mut next = Config::clone(&self.config.load());
        f(&mut next);
        self.update(next)
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_survives_update() {
        let cache = ConfigCache::default();
        let before = cache.get();

        cache
            .modify(|config| config.locales.default = "en".to_string())
            .unwrap();

        assert_eq!(before.locales.default, "ja");
        assert_eq!(cache.get().locales.default, "en");
    }

    #[test]
    fn test_invalid_update_keeps_previous() {
        let cache = ConfigCache::default();

        let result = cache.modify(|config| config.locales.supported.clear());

        assert!(result.is_err());
        assert_eq!(cache.get().locales.supported, vec!["ja", "en"]);
    }
}

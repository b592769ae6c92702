//! Default values for every configuration section.

use crate::schema::*;
use kotoba_common::LoggingConfig;
use std::path::PathBuf;

/// Locale used when nothing else is configured.
pub const DEFAULT_LOCALE: &str = "ja";

/// Marker attribute prefix used by the popup and options markup.
pub const DEFAULT_MARKER_PREFIX: &str = "data-i18n";

impl Default for Config {
    fn default() -> Self {
        Self {
            locales: LocalesConfig::default(),
            resources: ResourcesConfig::default(),
            preferences: PreferencesConfig::default(),
            markers: MarkersConfig::default(),
            fallback: FallbackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_LOCALE.to_string(),
            supported: vec!["ja".to_string(), "en".to_string()],
            override_locale: None,
        }
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            kind: ResourceKind::Directory,
            path: PathBuf::from("locales"),
            url: None,
            timeout_seconds: 10,
        }
    }
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_MARKER_PREFIX.to_string(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            missing_key: MissingKeyMode::Literal,
            placeholder: "[{key}]".to_string(),
        }
    }
}

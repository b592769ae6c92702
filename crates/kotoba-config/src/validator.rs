//! Semantic validation run after every load and before every save.

use crate::loader::ConfigError;
use crate::schema::{Config, MissingKeyMode, ResourceKind};
use std::collections::HashSet;

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, reporting the first offending field.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_locales(config)?;
        Self::validate_resources(config)?;
        Self::validate_markers(config)?;
        Self::validate_fallback(config)
    }

    fn validate_locales(config: &Config) -> Result<(), ConfigError> {
        let locales = &config.locales;
        if locales.supported.is_empty() {
            return Err(invalid("locales.supported", "at least one locale is required"));
        }

        let mut seen = HashSet::new();
        for code in &locales.supported {
            let code = code.trim().to_lowercase();
            if code.is_empty() {
                return Err(invalid("locales.supported", "locale codes cannot be empty"));
            }
            if !seen.insert(code.clone()) {
                return Err(invalid(
                    "locales.supported",
                    format!("duplicate locale '{code}'"),
                ));
            }
        }

        if !seen.contains(&locales.default.trim().to_lowercase()) {
            return Err(invalid(
                "locales.default",
                format!("default locale '{}' is not in locales.supported", locales.default),
            ));
        }

        if let Some(override_locale) = &locales.override_locale {
            if override_locale.trim().is_empty() {
                return Err(invalid("locales.override", "override cannot be empty"));
            }
        }

        Ok(())
    }

    fn validate_resources(config: &Config) -> Result<(), ConfigError> {
        let resources = &config.resources;
        match resources.kind {
            ResourceKind::Remote if resources.url.is_none() => Err(invalid(
                "resources.url",
                "remote resources require a base url",
            )),
            ResourceKind::Remote if resources.timeout_seconds == 0 => Err(invalid(
                "resources.timeout_seconds",
                "timeout must be greater than zero",
            )),
            ResourceKind::Directory if resources.path.as_os_str().is_empty() => Err(invalid(
                "resources.path",
                "directory resources require a path",
            )),
            _ => Ok(()),
        }
    }

    fn validate_markers(config: &Config) -> Result<(), ConfigError> {
        let prefix = &config.markers.prefix;
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            return Err(invalid(
                "markers.prefix",
                "prefix must be a non-empty attribute name",
            ));
        }
        Ok(())
    }

    fn validate_fallback(config: &Config) -> Result<(), ConfigError> {
        if config.fallback.missing_key == MissingKeyMode::Placeholder
            && config.fallback.placeholder.is_empty()
        {
            return Err(invalid(
                "fallback.placeholder",
                "placeholder mode needs a non-empty template",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

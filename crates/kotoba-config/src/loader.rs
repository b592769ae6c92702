//! Configuration loading and persistence with atomic file operations.

use crate::schema::Config;
use crate::validator::ConfigValidator;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "KOTOBA_CONFIG_PATH";

/// File names probed in the working directory, in order.
const DEFAULT_CONFIG_FILES: [&str; 3] = ["kotoba.toml", "kotoba.yaml", "kotoba.yml"];

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading or writing a configuration file
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// YAML parsing or serialization error
    #[error("Failed to process YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension is neither TOML nor YAML
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Configuration validation error
    #[error("Invalid configuration field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParse {
        var: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Atomic rename of the written file failed
    #[error("Failed to persist configuration file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl From<ConfigError> for kotoba_common::KotobaError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, message } => {
                kotoba_common::KotobaError::validation_field(message, field)
            }
            other => kotoba_common::KotobaError::config_with_source("Configuration loading error", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Configuration loader for the application
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader bound to a specific file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this loader reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load configuration from the default sources.
    ///
    /// Resolution order: `KOTOBA_CONFIG_PATH`, then `kotoba.toml`,
    /// `kotoba.yaml`, `kotoba.yml` in the working directory, then built-in
    /// defaults. Environment overrides and validation always apply.
    pub fn load() -> Result<Config, ConfigError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Self::new(path).read();
        }

        for candidate in DEFAULT_CONFIG_FILES {
            if Path::new(candidate).exists() {
                return Self::new(candidate).read();
            }
        }

        debug!("No configuration file found, using defaults");
        let mut config = Config::default();
        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        Self::new(path.as_ref()).read()
    }

    /// Reads, overrides and validates the bound file.
    pub fn read(&self) -> Result<Config, ConfigError> {
        let format = Format::from_path(&self.path)?;
        let content = std::fs::read_to_string(&self.path)?;
        let mut config = Self::parse(&content, format)?;

        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;

        info!("Loaded configuration from {}", self.path.display());
        Ok(config)
    }

    /// Saves configuration to the bound file atomically.
    ///
    /// The file is written next to its destination and renamed into place, so
    /// readers never see a partial document.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        ConfigValidator::validate(config)?;

        let rendered = match Format::from_path(&self.path)? {
            Format::Toml => toml::to_string_pretty(config)?,
            Format::Yaml => serde_yaml::to_string(config)?,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    fn parse(content: &str, format: Format) -> Result<Config, ConfigError> {
        Ok(match format {
            Format::Toml => toml::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
        })
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        Self::apply_overrides_from(config, |var| env::var(var).ok())
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(locale) = lookup("KOTOBA_LOCALE") {
            config.locales.override_locale = Some(locale);
        }

        if let Some(default) = lookup("KOTOBA_DEFAULT_LOCALE") {
            config.locales.default = default;
        }

        if let Some(supported) = lookup("KOTOBA_SUPPORTED_LOCALES") {
            config.locales.supported = supported
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(path) = lookup("KOTOBA_RESOURCES_PATH") {
            config.resources.path = PathBuf::from(path);
        }

        if let Some(url) = lookup("KOTOBA_RESOURCES_URL") {
            let parsed = url.parse().map_err(|e| ConfigError::EnvParse {
                var: "KOTOBA_RESOURCES_URL".to_string(),
                source: Box::new(e),
            })?;
            config.resources.url = Some(parsed);
        }

        if let Some(timeout) = lookup("KOTOBA_RESOURCES_TIMEOUT") {
            config.resources.timeout_seconds =
                timeout.parse().map_err(|e| ConfigError::EnvParse {
                    var: "KOTOBA_RESOURCES_TIMEOUT".to_string(),
                    source: Box::new(e),
                })?;
        }

        if let Some(path) = lookup("KOTOBA_PREFERENCES_PATH") {
            config.preferences.path = Some(PathBuf::from(path));
        }

        if let Some(level) = lookup("KOTOBA_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MissingKeyMode, ResourceKind};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
[locales]
default = "en"
supported = ["en", "ja"]
override = "ja"

[resources]
kind = "embedded"

[fallback]
missing_key = "blank"
"#;
        let config = ConfigLoader::parse(content, Format::Toml).unwrap();
        assert_eq!(config.locales.default, "en");
        assert_eq!(config.locales.override_locale.as_deref(), Some("ja"));
        assert_eq!(config.resources.kind, ResourceKind::Embedded);
        assert_eq!(config.fallback.missing_key, MissingKeyMode::Blank);
        assert_eq!(config.markers.prefix, "data-i18n");
    }

    #[test]
    fn test_parse_yaml() {
        let content = "locales:\n  default: ja\n  supported: [ja, en]\nmarkers:\n  prefix: data-l10n\n";
        let config = ConfigLoader::parse(content, Format::Yaml).unwrap();
        assert_eq!(config.locales.supported, vec!["ja", "en"]);
        assert_eq!(config.markers.prefix, "data-l10n");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Format::from_path(Path::new("kotoba.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        ConfigLoader::apply_overrides_from(
            &mut config,
            lookup_from(&[
                ("KOTOBA_LOCALE", "en-US"),
                ("KOTOBA_SUPPORTED_LOCALES", "ja, en ,"),
                ("KOTOBA_RESOURCES_TIMEOUT", "3"),
                ("KOTOBA_LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.locales.override_locale.as_deref(), Some("en-US"));
        assert_eq!(config.locales.supported, vec!["ja", "en"]);
        assert_eq!(config.resources.timeout_seconds, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_override_parse_failure_names_variable() {
        let mut config = Config::default();
        let err = ConfigLoader::apply_overrides_from(
            &mut config,
            lookup_from(&[("KOTOBA_RESOURCES_TIMEOUT", "soon")]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::EnvParse { ref var, .. } if var == "KOTOBA_RESOURCES_TIMEOUT"));
    }
}

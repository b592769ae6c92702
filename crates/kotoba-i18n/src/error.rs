//! Error types for internationalization operations

use thiserror::Error;

/// Errors that can occur during internationalization operations
///
/// None of these is fatal to the host: public operations on
/// [`crate::Localizer`] degrade (default locale, literal key, stale text) and
/// log instead of surfacing them.
#[derive(Error, Debug)]
pub enum I18nError {
    /// A detection signal could not be read
    #[error("Detection source '{source_name}' unavailable: {reason}")]
    DetectionSourceUnavailable { source_name: String, reason: String },

    /// The provider failed to deliver a resource tree
    #[error("Failed to load resources for locale {locale}: {reason}")]
    ResourceLoadFailure { locale: String, reason: String },

    /// A resource document was not a valid tree
    #[error("Invalid resource tree for locale {locale}: {source}")]
    ResourceParse {
        locale: String,
        #[source]
        source: serde_json::Error,
    },

    /// A key resolved in neither the active nor the default locale
    #[error("Missing translation key '{key}' for locale {locale}")]
    MissingTranslationKey { locale: String, key: String },

    /// A template referenced a parameter that was not supplied
    #[error("Missing interpolation parameter '{name}' in key '{key}'")]
    InterpolationParamMissing { key: String, name: String },

    /// The preference store rejected a write
    #[error("Failed to persist locale preference: {reason}")]
    PersistenceWriteFailure { reason: String },

    /// The preference store could not be read
    #[error("Failed to read locale preference: {reason}")]
    PersistenceReadFailure { reason: String },

    /// A single binding could not be applied to the UI tree
    #[error("Failed to update '{slot}' for key '{key}': {reason}")]
    UiWriteFailure {
        key: String,
        slot: String,
        reason: String,
    },

    /// The change watcher could not be installed
    #[error("Change watcher unavailable: {0}")]
    WatcherUnavailable(String),

    /// The supported locale set is malformed
    #[error("Invalid locale set: {0}")]
    InvalidLocaleSet(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error outside resource parsing
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl I18nError {
    /// Build a load failure from any displayable cause
    pub fn load_failure(locale: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ResourceLoadFailure {
            locale: locale.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<I18nError> for kotoba_common::KotobaError {
    fn from(err: I18nError) -> Self {
        let locale = match &err {
            I18nError::ResourceLoadFailure { locale, .. }
            | I18nError::ResourceParse { locale, .. }
            | I18nError::MissingTranslationKey { locale, .. } => Some(locale.clone()),
            _ => None,
        };
        kotoba_common::KotobaError::localization_with_source(err.to_string(), locale, err)
    }
}

/// Result type for i18n operations
pub type I18nResult<T> = Result<T, I18nError>;

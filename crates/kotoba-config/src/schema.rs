//! Configuration schema definitions using serde.

use kotoba_common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Main configuration structure for kotoba.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Supported locales and detection override.
    pub locales: LocalesConfig,
    /// Where per-locale resource trees come from.
    pub resources: ResourcesConfig,
    /// Durable locale preference storage.
    pub preferences: PreferencesConfig,
    /// UI marker vocabulary.
    pub markers: MarkersConfig,
    /// Behavior when a key resolves in no locale.
    pub fallback: FallbackConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Locale configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalesConfig {
    /// Default (fallback) locale code; always loaded.
    pub default: String,
    /// Supported locale codes, in display order.
    pub supported: Vec<String>,
    /// Explicit override consulted before every other detection signal.
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_locale: Option<String>,
}

/// Resource transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// `<path>/<locale>.json` files on disk.
    Directory,
    /// `<url>/<locale>.json` over HTTP.
    Remote,
    /// Trees compiled into the binary.
    Embedded,
}

/// Resource provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Transport used to fetch resource trees.
    pub kind: ResourceKind,
    /// Directory holding `<locale>.json` files.
    pub path: PathBuf,
    /// Base URL for the remote transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Request timeout for the remote transport.
    pub timeout_seconds: u64,
}

/// Preference persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// JSON file holding the persisted preference; in-memory when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// UI marker vocabulary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    /// Attribute prefix; `data-i18n` yields `data-i18n-title` and friends.
    pub prefix: String,
}

/// What to render when a key is missing from every loaded locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKeyMode {
    /// Render the key itself.
    Literal,
    /// Render nothing.
    Blank,
    /// Render `fallback.placeholder` with `{key}` substituted.
    Placeholder,
}

/// Fallback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Missing key behavior.
    pub missing_key: MissingKeyMode,
    /// Template used by [`MissingKeyMode::Placeholder`].
    pub placeholder: String,
}

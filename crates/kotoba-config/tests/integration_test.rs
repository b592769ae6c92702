//! Integration tests for kotoba-config crate.
//!
//! These tests exercise loading and saving real files on disk.

use kotoba_common::test_utils::{create_temp_dir, init_test_logging, write_fixture};
use kotoba_config::{Config, ConfigError, ConfigLoader, MissingKeyMode, ResourceKind};

#[test]
fn test_load_toml_file() {
    init_test_logging();
    let dir = create_temp_dir();
    let path = write_fixture(
        &dir,
        "kotoba.toml",
        r#"
[locales]
default = "ja"
supported = ["ja", "en"]

[resources]
kind = "remote"
url = "https://example.invalid/i18n/"
timeout_seconds = 5

[fallback]
missing_key = "placeholder"
placeholder = "??{key}??"
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();

    assert_eq!(config.resources.kind, ResourceKind::Remote);
    assert_eq!(
        config.resources.url.as_ref().map(|u| u.as_str()),
        Some("https://example.invalid/i18n/")
    );
    assert_eq!(config.fallback.missing_key, MissingKeyMode::Placeholder);
    assert_eq!(config.fallback.placeholder, "??{key}??");
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = create_temp_dir();
    let path = write_fixture(
        &dir,
        "kotoba.yaml",
        "locales:\n  default: fr\n  supported: [ja, en]\n",
    );

    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn test_save_then_load_preserves_values() {
    let dir = create_temp_dir();
    let loader = ConfigLoader::new(dir.path().join("kotoba.toml"));

    let mut config = Config::default();
    config.locales.override_locale = Some("en".to_string());
    config.preferences.path = Some(dir.path().join("prefs.json"));
    loader.save(&config).unwrap();

    let loaded = loader.read().unwrap();
    assert_eq!(loaded.locales.override_locale.as_deref(), Some("en"));
    assert_eq!(loaded.preferences.path, config.preferences.path);
}

#[test]
fn test_save_refuses_invalid_config() {
    let dir = create_temp_dir();
    let loader = ConfigLoader::new(dir.path().join("kotoba.toml"));

    let mut config = Config::default();
    config.markers.prefix.clear();

    assert!(loader.save(&config).is_err());
    assert!(!loader.path().exists());
}

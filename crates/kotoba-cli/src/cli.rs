//! Command-line argument definitions.

use clap::Parser;
use kotoba_config::Config;
use kotoba_i18n::Params;
use std::path::PathBuf;

/// Render a localized sample popup and inspect locale detection.
#[derive(Parser, Debug)]
#[command(name = "kotoba", version)]
pub struct Cli {
    /// Configuration file (TOML or YAML).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Locale that wins over every detected signal.
    #[arg(long, value_name = "CODE")]
    pub locale: Option<String>,
    /// Switch to this locale after start-up, as a manual choice.
    #[arg(long, value_name = "CODE")]
    pub switch_to: Option<String>,
    /// Log level filter, e.g. `debug` or `kotoba_i18n=trace`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
    /// Interpolation parameter for `KEY` lookups, as `name=value`.
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
    /// Print the detection report as JSON.
    #[arg(long)]
    pub details: bool,
    /// Resource keys to render after start-up.
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,
}

impl Cli {
    /// Fold command-line overrides into `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(locale) = &self.locale {
            config.locales.override_locale = Some(locale.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }

    /// Parameters collected from `--param`.
    pub fn key_params(&self) -> Params {
        self.params.iter().cloned().collect()
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}

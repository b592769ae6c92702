//! Application-wide error types using thiserror.

use kotoba_common::KotobaError;
use kotoba_config::ConfigError;
use kotoba_i18n::I18nError;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Localization engine error.
    #[error("Localization error: {0}")]
    Localization(#[from] I18nError),

    /// Shared workspace error.
    #[error(transparent)]
    Common(#[from] KotobaError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the command-line application.
pub type CliResult<T> = Result<T, CliError>;

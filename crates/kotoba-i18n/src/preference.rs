//! Durable storage of the user's locale choice

use crate::error::{I18nError, I18nResult};
use crate::locale::LocaleCode;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The stored locale choice and how it was made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPreference {
    /// Chosen locale
    pub locale_code: LocaleCode,
    /// `true` when the locale came from detection rather than the user
    pub auto_detected: bool,
}

impl PersistedPreference {
    /// Create a preference record
    pub fn new(locale_code: LocaleCode, auto_detected: bool) -> Self {
        Self {
            locale_code,
            auto_detected,
        }
    }
}

/// Key-value store holding the [`PersistedPreference`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read the stored preference, `None` when nothing was saved yet
    async fn get(&self) -> I18nResult<Option<PersistedPreference>>;

    /// Replace the stored preference
    async fn set(&self, preference: &PersistedPreference) -> I18nResult<()>;
}

/// Process-local store, for tests and hosts without durable storage
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    value: Mutex<Option<PersistedPreference>>,
    writes: Mutex<usize>,
}

impl MemoryPreferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `preference`
    pub fn with_preference(preference: PersistedPreference) -> Self {
        Self {
            value: Mutex::new(Some(preference)),
            writes: Mutex::new(0),
        }
    }

    /// Current value without going through the async interface
    pub fn snapshot(&self) -> Option<PersistedPreference> {
        self.value.lock().clone()
    }

    /// Number of successful `set` calls
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self) -> I18nResult<Option<PersistedPreference>> {
        Ok(self.value.lock().clone())
    }

    async fn set(&self, preference: &PersistedPreference) -> I18nResult<()> {
        *self.value.lock() = Some(preference.clone());
        *self.writes.lock() += 1;
        Ok(())
    }
}

/// Preference stored as a small JSON document on disk
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash never leaves a truncated document.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    /// Create a store backed by `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> I18nResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| I18nError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn get(&self) -> I18nResult<Option<PersistedPreference>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(I18nError::PersistenceReadFailure {
                    reason: format!("{}: {e}", self.path.display()),
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| I18nError::PersistenceReadFailure {
                reason: format!("{}: {e}", self.path.display()),
            })
    }

    async fn set(&self, preference: &PersistedPreference) -> I18nResult<()> {
        let bytes = serde_json::to_vec_pretty(preference)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || Self::write_atomically(&path, &bytes))
            .await
            .map_err(|e| I18nError::PersistenceWriteFailure {
                reason: e.to_string(),
            })?
            .map_err(|e| I18nError::PersistenceWriteFailure {
                reason: e.to_string(),
            })?;

        debug!("Persisted locale preference to {}", self.path.display());
        Ok(())
    }
}

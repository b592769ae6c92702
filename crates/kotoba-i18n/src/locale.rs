//! Locale codes and the fixed set of supported locales

use crate::error::{I18nError, I18nResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use unic_langid::LanguageIdentifier;

/// A normalized (trimmed, lower-case) locale code such as `ja` or `en`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Create a code, trimming and lower-casing the input
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`zh` for `zh-tw`)
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocaleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LocaleCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocaleCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl PartialEq<str> for LocaleCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LocaleCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The small, fixed set of locales the application ships
///
/// Exactly one member is the default; it is the fallback for every lookup and
/// is always loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSet {
    supported: Vec<LocaleCode>,
    default: LocaleCode,
}

impl LocaleSet {
    /// Build a set, rejecting empty lists, duplicates, and a default that is
    /// not a member
    pub fn new<I, S>(supported: I, default: impl AsRef<str>) -> I18nResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes: Vec<LocaleCode> = Vec::new();
        for code in supported {
            let code = LocaleCode::new(code);
            if code.as_str().is_empty() {
                return Err(I18nError::InvalidLocaleSet("empty locale code".to_string()));
            }
            if codes.contains(&code) {
                return Err(I18nError::InvalidLocaleSet(format!("duplicate locale '{code}'")));
            }
            codes.push(code);
        }

        if codes.is_empty() {
            return Err(I18nError::InvalidLocaleSet("no supported locales".to_string()));
        }

        let default = LocaleCode::new(default);
        if !codes.contains(&default) {
            return Err(I18nError::InvalidLocaleSet(format!(
                "default locale '{default}' is not supported"
            )));
        }

        Ok(Self {
            supported: codes,
            default,
        })
    }

    /// Supported codes in declaration order
    pub fn supported(&self) -> &[LocaleCode] {
        &self.supported
    }

    /// The default (fallback) locale
    pub fn default_locale(&self) -> &LocaleCode {
        &self.default
    }

    /// Whether `code` is exactly one of the supported codes
    pub fn is_supported(&self, code: &str) -> bool {
        self.find_exact(code).is_some()
    }

    fn find_exact(&self, code: &str) -> Option<&LocaleCode> {
        self.supported.iter().find(|c| c.as_str() == code)
    }

    /// Map a raw platform or user locale string onto a supported code
    ///
    /// Handles POSIX forms (`ja_JP.UTF-8`, `de_DE@euro`) and BCP 47 tags. An
    /// exact match wins, then the longest supported code that is a subtag
    /// prefix of the input, then a match on the primary language subtag.
    pub fn normalize(&self, raw: &str) -> Option<LocaleCode> {
        let mut cleaned = raw.trim();
        if let Some((head, _)) = cleaned.split_once('.') {
            cleaned = head;
        }
        if let Some((head, _)) = cleaned.split_once('@') {
            cleaned = head;
        }
        let cleaned = cleaned.replace('_', "-").to_lowercase();
        if cleaned.is_empty() {
            return None;
        }

        if let Some(code) = self.find_exact(&cleaned) {
            return Some(code.clone());
        }

        if let Some(code) = self
            .supported
            .iter()
            .filter(|c| {
                cleaned
                    .strip_prefix(c.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
            })
            .max_by_key(|c| c.as_str().len())
        {
            return Some(code.clone());
        }

        let language = match cleaned.parse::<LanguageIdentifier>() {
            Ok(id) => id.language.as_str().to_string(),
            Err(_) => cleaned.split('-').next().unwrap_or_default().to_string(),
        };

        self.supported
            .iter()
            .find(|c| c.language() == language)
            .cloned()
    }
}

//! Locale detection from an ordered cascade of environment signals
//!
//! Sources are consulted strictly in priority order and awaited one at a
//! time. The first raw value that normalizes to a supported locale wins and
//! no later source is queried. A failing source is skipped.

use crate::error::{I18nError, I18nResult};
use crate::locale::{LocaleCode, LocaleSet};
use crate::preference::PreferenceStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// One signal consulted during detection
#[async_trait]
pub trait DetectionSource: Send + Sync {
    /// Stable name shown in diagnostics
    fn name(&self) -> &str;

    /// Raw candidate codes, best first; empty when the signal has no value
    async fn candidates(&self) -> I18nResult<Vec<String>>;

    /// Whether a hit from this source reflects an explicit user choice
    fn is_manual(&self) -> bool {
        false
    }

    /// Whether a hit from this source holds for the current run only
    fn is_transient(&self) -> bool {
        false
    }
}

/// Explicit override from configuration or the command line
#[derive(Debug, Clone, Default)]
pub struct ExplicitOverride {
    value: Option<String>,
}

impl ExplicitOverride {
    /// Create an override; `None` makes the source inert
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }
}

#[async_trait]
impl DetectionSource for ExplicitOverride {
    fn name(&self) -> &str {
        "override"
    }

    async fn candidates(&self) -> I18nResult<Vec<String>> {
        Ok(self.value.iter().cloned().collect())
    }

    fn is_manual(&self) -> bool {
        true
    }

    fn is_transient(&self) -> bool {
        true
    }
}

/// The preference saved by an earlier session
///
/// Only a manual choice is honored; an auto-detected preference is detected
/// afresh so platform changes take effect.
pub struct PersistedPreferenceSource {
    store: Arc<dyn PreferenceStore>,
}

impl PersistedPreferenceSource {
    /// Create a source reading from `store`
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DetectionSource for PersistedPreferenceSource {
    fn name(&self) -> &str {
        "persisted"
    }

    async fn candidates(&self) -> I18nResult<Vec<String>> {
        Ok(self
            .store
            .get()
            .await?
            .filter(|pref| !pref.auto_detected)
            .map(|pref| vec![pref.locale_code.as_str().to_string()])
            .unwrap_or_default())
    }

    fn is_manual(&self) -> bool {
        true
    }
}

/// The platform's UI locale
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformLocaleSource;

#[async_trait]
impl DetectionSource for PlatformLocaleSource {
    fn name(&self) -> &str {
        "platform"
    }

    async fn candidates(&self) -> I18nResult<Vec<String>> {
        Ok(sys_locale::get_locale().into_iter().collect())
    }
}

/// The platform's ordered list of preferred languages
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferredLanguagesSource;

#[async_trait]
impl DetectionSource for PreferredLanguagesSource {
    fn name(&self) -> &str {
        "preferred-languages"
    }

    async fn candidates(&self) -> I18nResult<Vec<String>> {
        Ok(sys_locale::get_locales().collect())
    }
}

/// POSIX locale environment variables
#[derive(Debug, Clone)]
pub struct EnvironmentSource {
    vars: Vec<String>,
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        Self {
            vars: ["LC_ALL", "LC_MESSAGES", "LANG"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EnvironmentSource {
    /// Consult `vars` in order instead of the POSIX defaults
    pub fn with_vars<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DetectionSource for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    async fn candidates(&self) -> I18nResult<Vec<String>> {
        Ok(self
            .vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && value != "C" && value != "POSIX")
            .take(1)
            .collect())
    }
}

/// Fixed values supplied by the host, e.g. languages reported by a browser
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    values: Vec<String>,
}

impl StaticSource {
    /// Create a named source yielding `values`
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DetectionSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn candidates(&self) -> I18nResult<Vec<String>> {
        Ok(self.values.clone())
    }
}

/// What a single source reported during the last detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SignalOutcome {
    /// Raw values as reported, before normalization
    Value(Vec<String>),
    /// The source had nothing to say
    Empty,
    /// The source failed; the error text is kept for diagnostics
    Unavailable(String),
    /// A higher-priority source already decided
    NotConsulted,
}

/// A source name paired with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalReading {
    /// Source name
    pub source: String,
    /// What it reported
    pub outcome: SignalOutcome,
}

/// How the final locale was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionDecision {
    /// A source produced a supported locale
    Matched {
        /// Winning source
        source: String,
        /// Raw value before normalization
        raw: String,
    },
    /// No source matched; the default locale applies
    Default,
}

/// Diagnostics for one detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    /// Every configured source, in priority order
    pub signals: Vec<SignalReading>,
    /// Chosen locale
    pub locale: LocaleCode,
    /// How it was chosen
    pub decision: DetectionDecision,
    /// `false` when the winner was an explicit or persisted manual choice
    pub auto_detected: bool,
    /// `true` when the winner must not be saved as a preference
    pub transient: bool,
}

/// Resolves the active locale from the configured signal cascade
pub struct LanguageDetector {
    locales: LocaleSet,
    sources: Vec<Box<dyn DetectionSource>>,
    last_report: Mutex<Option<DetectionReport>>,
}

impl std::fmt::Debug for LanguageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDetector")
            .field("locales", &self.locales)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl LanguageDetector {
    /// Create a detector with sources in priority order
    pub fn new(locales: LocaleSet, sources: Vec<Box<dyn DetectionSource>>) -> Self {
        Self {
            locales,
            sources,
            last_report: Mutex::new(None),
        }
    }

    /// Standard cascade: override, persisted choice, platform locale,
    /// preferred languages, environment
    pub fn with_default_sources(
        locales: LocaleSet,
        override_locale: Option<String>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self::new(
            locales,
            vec![
                Box::new(ExplicitOverride::new(override_locale)),
                Box::new(PersistedPreferenceSource::new(preferences)),
                Box::new(PlatformLocaleSource),
                Box::new(PreferredLanguagesSource),
                Box::new(EnvironmentSource::default()),
            ],
        )
    }

    /// Map a raw code onto a supported locale
    pub fn normalize_locale(&self, raw: &str) -> Option<LocaleCode> {
        self.locales.normalize(raw)
    }

    /// Whether `code` is one of the supported locales
    pub fn is_supported(&self, code: &str) -> bool {
        self.locales.is_supported(code)
    }

    /// The supported locale set
    pub fn locales(&self) -> &LocaleSet {
        &self.locales
    }

    /// Report of the most recent [`detect`](Self::detect) run
    pub fn detection_details(&self) -> Option<DetectionReport> {
        self.last_report.lock().clone()
    }

    /// Resolve the active locale
    pub async fn detect(&self) -> LocaleCode {
        self.detect_with_report().await.locale
    }

    /// Resolve the active locale and keep the full report
    pub async fn detect_with_report(&self) -> DetectionReport {
        let mut signals = Vec::with_capacity(self.sources.len());
        let mut winner: Option<(usize, LocaleCode, String)> = None;

        for (index, source) in self.sources.iter().enumerate() {
            let outcome = match source.candidates().await {
                Ok(values) if values.is_empty() => SignalOutcome::Empty,
                Ok(values) => {
                    if let Some((code, raw)) = values
                        .iter()
                        .find_map(|raw| self.normalize_locale(raw).map(|code| (code, raw.clone())))
                    {
                        winner = Some((index, code, raw));
                    }
                    SignalOutcome::Value(values)
                }
                Err(e) => {
                    let e = match e {
                        e @ I18nError::DetectionSourceUnavailable { .. } => e,
                        other => I18nError::DetectionSourceUnavailable {
                            source_name: source.name().to_string(),
                            reason: other.to_string(),
                        },
                    };
                    debug!("Skipping detection source: {}", e);
                    SignalOutcome::Unavailable(e.to_string())
                }
            };

            signals.push(SignalReading {
                source: source.name().to_string(),
                outcome,
            });

            if winner.is_some() {
                break;
            }
        }

        for source in self.sources.iter().skip(signals.len()) {
            signals.push(SignalReading {
                source: source.name().to_string(),
                outcome: SignalOutcome::NotConsulted,
            });
        }

        let report = match winner {
            Some((index, locale, raw)) => {
                let source = &self.sources[index];
                DetectionReport {
                    signals,
                    locale,
                    decision: DetectionDecision::Matched {
                        source: source.name().to_string(),
                        raw,
                    },
                    auto_detected: !source.is_manual(),
                    transient: source.is_transient(),
                }
            }
            None => DetectionReport {
                signals,
                locale: self.locales.default_locale().clone(),
                decision: DetectionDecision::Default,
                auto_detected: true,
                transient: false,
            },
        };

        info!(
            "Detected locale {} ({:?})",
            report.locale, report.decision
        );
        *self.last_report.lock() = Some(report.clone());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preference::{MemoryPreferenceStore, PersistedPreference};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSource;

    #[async_trait]
    impl DetectionSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn candidates(&self) -> I18nResult<Vec<String>> {
            Err(I18nError::DetectionSourceUnavailable {
                source_name: "failing".to_string(),
                reason: "no platform api".to_string(),
            })
        }
    }

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DetectionSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn candidates(&self) -> I18nResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["ja".to_string()])
        }
    }

    fn locales() -> LocaleSet {
        LocaleSet::new(["ja", "en"], "ja").unwrap()
    }

    fn source(name: &str, values: &[&str]) -> Box<dyn DetectionSource> {
        Box::new(StaticSource::new(name, values.iter().copied()))
    }

    #[tokio::test]
    async fn test_first_supported_signal_wins() {
        let detector = LanguageDetector::new(
            locales(),
            vec![source("a", &[]), source("b", &["en-US"]), source("c", &["ja"])],
        );

        assert_eq!(detector.detect().await, "en");

        let report = detector.detection_details().unwrap();
        assert_eq!(report.signals[0].outcome, SignalOutcome::Empty);
        assert_eq!(
            report.signals[1].outcome,
            SignalOutcome::Value(vec!["en-US".to_string()])
        );
        assert_eq!(report.signals[2].outcome, SignalOutcome::NotConsulted);
        assert_eq!(
            report.decision,
            DetectionDecision::Matched {
                source: "b".to_string(),
                raw: "en-US".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_later_sources_not_queried_after_match() {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = LanguageDetector::new(
            locales(),
            vec![
                source("first", &["en"]),
                Box::new(CountingSource {
                    calls: Arc::clone(&calls),
                }),
            ],
        );

        detector.detect().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let detector = LanguageDetector::new(
            locales(),
            vec![Box::new(FailingSource), source("next", &["en_GB.UTF-8"])],
        );

        assert_eq!(detector.detect().await, "en");
        let report = detector.detection_details().unwrap();
        assert!(matches!(report.signals[0].outcome, SignalOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unsupported_values_fall_through_to_default() {
        let detector = LanguageDetector::new(
            locales(),
            vec![source("a", &["fr-FR", "de"]), source("b", &["ko"])],
        );

        assert_eq!(detector.detect().await, "ja");
        let report = detector.detection_details().unwrap();
        assert_eq!(report.decision, DetectionDecision::Default);
        assert!(report.auto_detected);
    }

    #[tokio::test]
    async fn test_list_source_uses_first_supported_entry() {
        let detector =
            LanguageDetector::new(locales(), vec![source("list", &["fr", "en-AU", "ja"])]);
        assert_eq!(detector.detect().await, "en");
    }

    #[tokio::test]
    async fn test_manual_persisted_preference_wins_and_is_not_auto() {
        let store = Arc::new(MemoryPreferenceStore::with_preference(
            PersistedPreference::new(LocaleCode::new("en"), false),
        ));
        let detector = LanguageDetector::new(
            locales(),
            vec![
                Box::new(ExplicitOverride::new(None)),
                Box::new(PersistedPreferenceSource::new(store)),
                source("platform", &["ja-JP"]),
            ],
        );

        let report = detector.detect_with_report().await;
        assert_eq!(report.locale, "en");
        assert!(!report.auto_detected);
        assert!(report.transient);
    }

    #[tokio::test]
    async fn test_auto_detected_preference_is_redetected() {
        let store = Arc::new(MemoryPreferenceStore::with_preference(
            PersistedPreference::new(LocaleCode::new("en"), true),
        ));
        let detector = LanguageDetector::new(
            locales(),
            vec![
                Box::new(PersistedPreferenceSource::new(store)),
                source("platform", &["ja-JP"]),
            ],
        );

        let report = detector.detect_with_report().await;
        assert_eq!(report.locale, "ja");
        assert!(report.auto_detected);
    }

    #[tokio::test]
    async fn test_explicit_override_is_manual() {
        let detector = LanguageDetector::new(
            locales(),
            vec![Box::new(ExplicitOverride::new(Some("EN".to_string())))],
        );

        let report = detector.detect_with_report().await;
        assert_eq!(report.locale, "en");
        assert!(!report.auto_detected);
    }

    #[test]
    fn test_details_empty_before_detection() {
        let detector = LanguageDetector::new(locales(), Vec::new());
        assert!(detector.detection_details().is_none());
        assert!(detector.is_supported("ja"));
        assert!(!detector.is_supported("ja-jp"));
    }
}

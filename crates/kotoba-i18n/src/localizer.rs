//! The localization orchestrator
//!
//! [`Localizer`] owns the active locale. It drives start-up (detect, load,
//! persist), answers text lookups, and on every locale change resynchronizes
//! the attached UI tree and notifies listeners. None of its public
//! operations fail: problems are logged and the localizer degrades to the
//! default locale, a literal key, or momentarily stale text.

use crate::detector::{DetectionReport, DetectionSource, ExplicitOverride, LanguageDetector};
use crate::locale::{LocaleCode, LocaleSet};
use crate::preference::{MemoryPreferenceStore, PersistedPreference, PreferenceStore};
use crate::provider::ResourceProvider;
use crate::resource::Params;
use crate::store::{MissingKeyPolicy, ResourceStore};
use crate::sync::{SyncReport, TextSource, UiTreeSynchronizer};
use crate::error::I18nResult;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle of a [`Localizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizerState {
    /// `initialize` has not been called
    Uninitialized,
    /// Detection and loading are in progress
    Initializing,
    /// Fully operational
    Ready,
}

/// Result of [`Localizer::set_locale`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetLocaleOutcome {
    /// The locale is active, the UI was resynchronized and listeners ran
    Applied,
    /// The code matches no supported locale; nothing changed
    Unsupported,
    /// Called before the localizer was ready; nothing changed
    NotReady,
    /// A newer change arrived while this one was loading
    Superseded,
}

/// Event passed to locale-change listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleChanged {
    /// Locale before the change
    pub previous: LocaleCode,
    /// Locale after the change
    pub current: LocaleCode,
    /// Whether the user chose it explicitly
    pub manual: bool,
}

type Listener = Arc<dyn Fn(&LocaleChanged) + Send + Sync>;

/// Resolves keys against whatever locale is active at call time
struct ActiveText {
    store: ResourceStore,
    locales: LocaleSet,
    current: RwLock<LocaleCode>,
    auto_detected: AtomicBool,
}

impl ActiveText {
    fn current(&self) -> LocaleCode {
        self.current.read().clone()
    }

    fn set_current(&self, locale: LocaleCode, auto_detected: bool) {
        self.auto_detected.store(auto_detected, Ordering::SeqCst);
        *self.current.write() = locale;
    }
}

impl TextSource for ActiveText {
    fn text(&self, key: &str, params: &Params) -> String {
        let current = self.current();
        self.store
            .resolve(&current, key, self.locales.default_locale(), params)
    }
}

/// Orchestrates detection, resource loading, persistence and UI updates
pub struct Localizer {
    active: Arc<ActiveText>,
    detector: LanguageDetector,
    preferences: Arc<dyn PreferenceStore>,
    synchronizer: RwLock<Option<Arc<UiTreeSynchronizer>>>,
    state: Mutex<LocalizerState>,
    generation: AtomicU64,
    // Last locale reported to listeners
    applied: Mutex<LocaleCode>,
    // Held across each preference write
    persisting: tokio::sync::Mutex<()>,
    listeners: RwLock<Vec<Listener>>,
}

impl std::fmt::Debug for Localizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localizer")
            .field("state", &self.state())
            .field("current", &self.current_locale())
            .field("locales", &self.active.locales)
            .finish()
    }
}

impl Localizer {
    /// Start building a localizer
    pub fn builder(locales: LocaleSet, provider: Arc<dyn ResourceProvider>) -> LocalizerBuilder {
        LocalizerBuilder::new(locales, provider)
    }

    /// Current lifecycle state
    pub fn state(&self) -> LocalizerState {
        *self.state.lock()
    }

    /// Detect, load and persist the initial locale
    ///
    /// Only the first call does anything. Always ends in
    /// [`LocalizerState::Ready`], on the default locale if necessary.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        {
            let mut state = self.state.lock();
            if *state != LocalizerState::Uninitialized {
                debug!("Initialize ignored in state {:?}", *state);
                return;
            }
            *state = LocalizerState::Initializing;
        }

        let store = &self.active.store;
        let default = self.default_locale().clone();
        let report = self.detector.detect_with_report().await;
        let detected = report.locale.clone();
        self.active.set_current(detected.clone(), report.auto_detected);

        let loaded = match store.load(&detected).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not load detected locale {}: {}", detected, e);
                false
            }
        };

        if detected != default {
            if let Err(e) = store.ensure_loaded(&default).await {
                error!("Default locale {} unavailable: {}", default, e);
            }
            if !loaded {
                warn!("Falling back to default locale {}", default);
                self.active.set_current(default.clone(), true);
            }
        }

        if report.transient {
            debug!("Not persisting {} chosen by a one-off override", detected);
        } else if loaded {
            self.persist(&detected, report.auto_detected, 0).await;
        }

        *self.applied.lock() = self.current_locale();
        *self.state.lock() = LocalizerState::Ready;
        info!(
            "Localizer ready with locale {} (auto-detected: {})",
            self.current_locale(),
            self.is_auto_detected()
        );

        self.resync();
    }

    /// Text for `key` in the active locale, falling back to the default
    pub fn get_text(&self, key: &str, params: &Params) -> String {
        self.active.text(key, params)
    }

    /// Switch the active locale
    #[instrument(skip(self))]
    pub async fn set_locale(&self, code: &str, manual: bool) -> SetLocaleOutcome {
        if self.state() != LocalizerState::Ready {
            warn!("Ignoring locale change to '{}' before initialization", code);
            return SetLocaleOutcome::NotReady;
        }

        let Some(locale) = self.active.locales.normalize(code) else {
            warn!("Unsupported locale '{}'", code);
            return SetLocaleOutcome::Unsupported;
        };

        let generation = {
            let _applied = self.applied.lock();
            self.active.set_current(locale.clone(), !manual);
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        self.persist(&locale, !manual, generation).await;

        if let Err(e) = self.active.store.ensure_loaded(&locale).await {
            warn!("Resources for {} unavailable, using fallback: {}", locale, e);
        }

        let previous = {
            let mut applied = self.applied.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                info!("Locale change to {} superseded", locale);
                return SetLocaleOutcome::Superseded;
            }
            std::mem::replace(&mut *applied, locale.clone())
        };

        info!("Locale changed from {} to {}", previous, locale);
        self.resync();
        self.notify(&LocaleChanged {
            previous,
            current: locale,
            manual,
        });
        SetLocaleOutcome::Applied
    }

    async fn persist(&self, locale: &LocaleCode, auto_detected: bool, generation: u64) {
        let _guard = self.persisting.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Skipping preference write for superseded locale {}", locale);
            return;
        }

        let preference = PersistedPreference::new(locale.clone(), auto_detected);
        if let Err(e) = self.preferences.set(&preference).await {
            warn!("{}", e);
        }
    }

    fn resync(&self) -> Option<SyncReport> {
        let synchronizer = self.synchronizer.read().clone()?;
        Some(synchronizer.full_sync(self.active.as_ref()))
    }

    fn notify(&self, event: &LocaleChanged) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(event);
        }
    }

    /// Active locale
    pub fn current_locale(&self) -> LocaleCode {
        self.active.current()
    }

    /// Whether the active locale was detected rather than chosen
    pub fn is_auto_detected(&self) -> bool {
        self.active.auto_detected.load(Ordering::SeqCst)
    }

    /// Supported locales in declaration order
    pub fn supported_locales(&self) -> &[LocaleCode] {
        self.active.locales.supported()
    }

    /// Fallback locale
    pub fn default_locale(&self) -> &LocaleCode {
        self.active.locales.default_locale()
    }

    /// Report of the detection run performed by `initialize`
    pub fn detection_details(&self) -> Option<DetectionReport> {
        self.detector.detection_details()
    }

    /// The resource cache
    pub fn store(&self) -> &ResourceStore {
        &self.active.store
    }

    /// Source rendering keys in the active locale, for UI layers
    pub fn text_source(&self) -> Arc<dyn TextSource> {
        Arc::clone(&self.active) as Arc<dyn TextSource>
    }

    /// Run `listener` after every applied locale change
    pub fn on_locale_change<F>(&self, listener: F)
    where
        F: Fn(&LocaleChanged) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Attach the UI tree to keep in sync, replacing any previous one
    pub fn attach_synchronizer(&self, synchronizer: UiTreeSynchronizer) {
        let previous = self
            .synchronizer
            .write()
            .replace(Arc::new(synchronizer));
        if let Some(previous) = previous {
            previous.stop_observing();
        }
    }

    /// The attached synchronizer
    pub fn synchronizer(&self) -> Option<Arc<UiTreeSynchronizer>> {
        self.synchronizer.read().clone()
    }

    /// Synchronize the whole UI tree now
    pub fn sync_now(&self) -> Option<SyncReport> {
        self.resync()
    }

    /// Keep content inserted later in sync; no-op without a UI tree
    pub fn start_observing(&self) -> I18nResult<()> {
        match self.synchronizer() {
            Some(synchronizer) => synchronizer.start_observing(self.text_source()),
            None => {
                debug!("No synchronizer attached, nothing to observe");
                Ok(())
            }
        }
    }

    /// Stop following UI changes
    pub fn stop_observing(&self) {
        if let Some(synchronizer) = self.synchronizer() {
            synchronizer.stop_observing();
        }
    }
}

/// Assembles a [`Localizer`]
pub struct LocalizerBuilder {
    locales: LocaleSet,
    provider: Arc<dyn ResourceProvider>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    sources: Option<Vec<Box<dyn DetectionSource>>>,
    override_locale: Option<String>,
    policy: MissingKeyPolicy,
    synchronizer: Option<UiTreeSynchronizer>,
}

impl LocalizerBuilder {
    /// Start from the required collaborators
    pub fn new(locales: LocaleSet, provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            locales,
            provider,
            preferences: None,
            sources: None,
            override_locale: None,
            policy: MissingKeyPolicy::default(),
            synchronizer: None,
        }
    }

    /// Durable preference store; defaults to an in-memory one
    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Replace the platform detection cascade
    ///
    /// An explicit override, when set, is still consulted first.
    pub fn sources(mut self, sources: Vec<Box<dyn DetectionSource>>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Locale that wins over every other signal
    pub fn override_locale(mut self, locale: Option<String>) -> Self {
        self.override_locale = locale;
        self
    }

    /// What to render for keys missing everywhere
    pub fn missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// UI tree to keep in sync
    pub fn synchronizer(mut self, synchronizer: UiTreeSynchronizer) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    /// Build the localizer in [`LocalizerState::Uninitialized`]
    pub fn build(self) -> Localizer {
        let preferences = self
            .preferences
            .unwrap_or_else(|| Arc::new(MemoryPreferenceStore::new()));

        let detector = match self.sources {
            None => LanguageDetector::with_default_sources(
                self.locales.clone(),
                self.override_locale,
                Arc::clone(&preferences),
            ),
            Some(mut sources) => {
                if self.override_locale.is_some() {
                    sources.insert(0, Box::new(ExplicitOverride::new(self.override_locale)));
                }
                LanguageDetector::new(self.locales.clone(), sources)
            }
        };

        let default = self.locales.default_locale().clone();
        Localizer {
            active: Arc::new(ActiveText {
                store: ResourceStore::with_policy(self.provider, self.policy),
                locales: self.locales,
                current: RwLock::new(default.clone()),
                auto_detected: AtomicBool::new(true),
            }),
            detector,
            preferences,
            synchronizer: RwLock::new(self.synchronizer.map(Arc::new)),
            state: Mutex::new(LocalizerState::Uninitialized),
            generation: AtomicU64::new(0),
            applied: Mutex::new(default),
            persisting: tokio::sync::Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::StaticSource;
    use crate::error::I18nError;
    use crate::preference::MockPreferenceStore;
    use crate::provider::{EmbeddedProvider, MockResourceProvider};
    use crate::resource::ResourceTree;

    fn locales() -> LocaleSet {
        LocaleSet::new(["ja", "en"], "ja").unwrap()
    }

    fn provider() -> Arc<dyn ResourceProvider> {
        Arc::new(
            EmbeddedProvider::new()
                .with_json("ja", r#"{"greeting": "こんにちは"}"#)
                .unwrap()
                .with_json("en", r#"{"greeting": "Hello"}"#)
                .unwrap(),
        )
    }

    fn detect(values: &[&str]) -> Vec<Box<dyn DetectionSource>> {
        vec![Box::new(StaticSource::new("test", values.iter().copied()))]
    }

    #[tokio::test]
    async fn test_get_text_before_ready_is_literal() {
        let localizer = Localizer::builder(locales(), provider()).sources(detect(&[])).build();
        assert_eq!(localizer.state(), LocalizerState::Uninitialized);
        assert_eq!(localizer.get_text("greeting", &Params::new()), "greeting");
        assert_eq!(
            localizer.set_locale("en", true).await,
            SetLocaleOutcome::NotReady
        );
    }

    #[tokio::test]
    async fn test_initialize_detects_and_loads_default() {
        let localizer = Localizer::builder(locales(), provider())
            .sources(detect(&["en-US"]))
            .build();

        localizer.initialize().await;

        assert_eq!(localizer.state(), LocalizerState::Ready);
        assert_eq!(localizer.current_locale(), "en");
        assert!(localizer.is_auto_detected());
        assert_eq!(
            localizer.store().loaded_locales(),
            vec![LocaleCode::new("en"), LocaleCode::new("ja")]
        );
        assert!(localizer.detection_details().is_some());
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let mut provider = MockResourceProvider::new();
        provider
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(ResourceTree::default()));
        let localizer = Localizer::builder(locales(), Arc::new(provider))
            .sources(detect(&[]))
            .build();

        localizer.initialize().await;
        localizer.initialize().await;
        assert_eq!(localizer.state(), LocalizerState::Ready);
    }

    #[tokio::test]
    async fn test_initialize_survives_total_load_failure() {
        let mut provider = MockResourceProvider::new();
        provider
            .expect_fetch()
            .returning(|locale| Err(I18nError::load_failure(locale.as_str(), "offline")));
        let mut preferences = MockPreferenceStore::new();
        preferences.expect_get().returning(|| Ok(None));
        preferences.expect_set().times(0);

        let localizer = Localizer::builder(locales(), Arc::new(provider))
            .preferences(Arc::new(preferences))
            .sources(detect(&["en"]))
            .build();
        localizer.initialize().await;

        assert_eq!(localizer.state(), LocalizerState::Ready);
        assert_eq!(localizer.current_locale(), "ja");
        assert_eq!(localizer.get_text("greeting", &Params::new()), "greeting");
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let mut preferences = MockPreferenceStore::new();
        preferences.expect_get().returning(|| Ok(None));
        preferences.expect_set().returning(|_| {
            Err(I18nError::PersistenceWriteFailure {
                reason: "quota".to_string(),
            })
        });

        let localizer = Localizer::builder(locales(), provider())
            .preferences(Arc::new(preferences))
            .sources(detect(&[]))
            .build();
        localizer.initialize().await;

        assert_eq!(localizer.set_locale("en", true).await, SetLocaleOutcome::Applied);
        assert_eq!(localizer.get_text("greeting", &Params::new()), "Hello");
    }

    #[tokio::test]
    async fn test_override_wins_over_sources() {
        let preferences = Arc::new(MemoryPreferenceStore::new());
        let localizer = Localizer::builder(locales(), provider())
            .preferences(preferences.clone())
            .sources(detect(&["ja"]))
            .override_locale(Some("en".to_string()))
            .build();
        localizer.initialize().await;

        assert_eq!(localizer.current_locale(), "en");
        assert!(!localizer.is_auto_detected());
        assert_eq!(preferences.write_count(), 0);
    }

    #[tokio::test]
    async fn test_listeners_receive_changes() {
        let localizer = Localizer::builder(locales(), provider())
            .sources(detect(&[]))
            .build();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        localizer.on_locale_change(move |event| sink.lock().push(event.clone()));

        localizer.initialize().await;
        localizer.set_locale("EN", true).await;
        localizer.set_locale("xx", true).await;

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            LocaleChanged {
                previous: LocaleCode::new("ja"),
                current: LocaleCode::new("en"),
                manual: true,
            }
        );
    }

    #[tokio::test]
    async fn test_observing_without_synchronizer_is_noop() {
        let localizer = Localizer::builder(locales(), provider())
            .sources(detect(&[]))
            .build();
        localizer.start_observing().unwrap();
        localizer.stop_observing();
        assert!(localizer.sync_now().is_none());
    }
}

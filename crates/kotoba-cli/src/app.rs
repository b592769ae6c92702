//! Wiring of configuration into a running localizer.

use crate::error::{CliError, CliResult};
use kotoba_common::KotobaError;
use kotoba_config::{Config, ConfigCache, FallbackConfig, MissingKeyMode, ResourceKind, ResourcesConfig};
use kotoba_i18n::{
    DirectoryProvider, Document, Element, EmbeddedProvider, JsonFilePreferenceStore, LocaleSet,
    Localizer, MarkerVocabulary, MemoryPreferenceStore, MissingKeyPolicy, PreferenceStore,
    RemoteProvider, ResourceProvider, SetLocaleOutcome, UiTreeSynchronizer,
};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Resource trees shipped inside the binary
const EMBEDDED_LOCALES: &[(&str, &str)] = &[
    ("ja", include_str!("../locales/ja.json")),
    ("en", include_str!("../locales/en.json")),
];

/// A localizer bound to the sample popup document
pub struct App {
    config: ConfigCache,
    localizer: Localizer,
    document: Arc<Document>,
}

impl App {
    /// Build every collaborator from `config`
    pub fn new(config: Config) -> CliResult<Self> {
        let locales = LocaleSet::new(&config.locales.supported, &config.locales.default)?;
        let provider = build_provider(&config.resources)?;
        let preferences = build_preferences(&config);
        let vocabulary = MarkerVocabulary::new(config.markers.prefix.clone());
        let document = sample_document(&vocabulary);

        let localizer = Localizer::builder(locales, provider)
            .preferences(preferences)
            .override_locale(config.locales.override_locale.clone())
            .missing_key_policy(missing_key_policy(&config.fallback))
            .synchronizer(UiTreeSynchronizer::for_document(
                Arc::clone(&document),
                vocabulary,
            ))
            .build();

        Ok(Self {
            config: ConfigCache::new(config),
            localizer,
            document,
        })
    }

    /// Active configuration snapshot
    pub fn config(&self) -> Arc<Config> {
        self.config.get()
    }

    /// The localizer
    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    /// The sample document
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Initialize the localizer and follow document changes
    pub async fn start(&self) -> CliResult<()> {
        self.localizer.initialize().await;
        self.localizer.start_observing()?;
        info!("kotoba started with locale {}", self.localizer.current_locale());
        Ok(())
    }

    /// Switch locale as a manual choice
    pub async fn switch(&self, code: &str) -> SetLocaleOutcome {
        self.localizer.set_locale(code, true).await
    }

    /// Indented outline of the document's current contents
    pub fn render(&self) -> String {
        let mut out = String::new();
        outline(self.document.root(), 0, &mut out);
        out
    }

    /// Stop following document changes
    pub fn shutdown(&self) {
        self.localizer.stop_observing();
        debug!("kotoba stopped");
    }
}

/// Resource provider selected by `resources.kind`
pub fn build_provider(config: &ResourcesConfig) -> CliResult<Arc<dyn ResourceProvider>> {
    Ok(match config.kind {
        ResourceKind::Directory => Arc::new(DirectoryProvider::new(&config.path)),
        ResourceKind::Remote => {
            let url = config.url.clone().ok_or_else(|| {
                CliError::Common(KotobaError::config("resources.url is required for remote resources"))
            })?;
            Arc::new(RemoteProvider::new(
                url,
                Duration::from_secs(config.timeout_seconds),
            )?)
        }
        ResourceKind::Embedded => {
            let mut provider = EmbeddedProvider::new();
            for (locale, json) in EMBEDDED_LOCALES {
                provider = provider.with_json(locale, json)?;
            }
            Arc::new(provider)
        }
    })
}

/// File-backed store when a path is configured, in-memory otherwise
pub fn build_preferences(config: &Config) -> Arc<dyn PreferenceStore> {
    match &config.preferences.path {
        Some(path) => Arc::new(JsonFilePreferenceStore::new(path)),
        None => Arc::new(MemoryPreferenceStore::new()),
    }
}

/// Missing-key policy for `fallback`
pub fn missing_key_policy(config: &FallbackConfig) -> MissingKeyPolicy {
    match config.missing_key {
        MissingKeyMode::Literal => MissingKeyPolicy::LiteralKey,
        MissingKeyMode::Blank => MissingKeyPolicy::Blank,
        MissingKeyMode::Placeholder => MissingKeyPolicy::Placeholder(config.placeholder.clone()),
    }
}

/// The contest popup used to demonstrate synchronization
pub fn sample_document(vocabulary: &MarkerVocabulary) -> Arc<Document> {
    let marker = vocabulary.default_marker();
    let slot = |suffix: &str| format!("{marker}-{suffix}");

    let root = Element::new("body")
        .with_child(Element::new("h1").with_attribute(marker, "popup.title"))
        .with_child(
            Element::new("div")
                .with_child(Element::new("input").with_attribute(marker, "popup.search"))
                .with_child(
                    Element::new("button")
                        .with_attribute(marker, "popup.refresh")
                        .with_attribute(slot("title"), "popup.refresh_hint"),
                ),
        )
        .with_child(
            Element::new("p")
                .with_attribute(marker, "popup.upcoming")
                .with_attribute(slot("args"), r#"{"count": 3}"#),
        )
        .with_child(
            Element::new("label")
                .with_attribute(marker, "settings.language")
                .with_attribute(slot("aria-label"), "settings.auto"),
        )
        .with_child(Element::new("footer").with_attribute(marker, "footer.credit"));

    Document::new(root)
}

fn outline(element: &Element, depth: usize, out: &mut String) {
    let _ = write!(out, "{:indent$}<{}", "", element.tag(), indent = depth * 2);
    for name in ["placeholder", "title", "aria-label", "alt"] {
        if let Some(value) = element.attribute(name) {
            let _ = write!(out, " {name}=\"{value}\"");
        }
    }
    out.push('>');
    let text = element.text();
    if !text.is_empty() {
        out.push(' ');
        out.push_str(&text);
    }
    out.push('\n');

    for child in element.children() {
        outline(&child, depth + 1, out);
    }
}

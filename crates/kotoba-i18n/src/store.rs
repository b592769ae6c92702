//! Per-locale resource cache with fallback resolution
//!
//! Trees are published through an [`ArcSwap`] snapshot so lookups never
//! block. A load replaces the entry for its locale copy-on-write; a failed
//! load leaves whatever was there before. Concurrent loads of one locale
//! share a single provider fetch.

use crate::error::{I18nError, I18nResult};
use crate::locale::LocaleCode;
use crate::provider::ResourceProvider;
use crate::resource::{interpolate, Params, ResourceTree};
use arc_swap::ArcSwap;
use dashmap::DashSet;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

type TreeMap = HashMap<LocaleCode, Arc<ResourceTree>>;
type LoadFuture = Shared<BoxFuture<'static, Result<Arc<ResourceTree>, Arc<I18nError>>>>;

/// What to render when a key resolves in neither locale
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MissingKeyPolicy {
    /// The key path itself
    #[default]
    LiteralKey,
    /// An empty string
    Blank,
    /// A template in which `{key}` is replaced by the key path
    Placeholder(String),
}

impl MissingKeyPolicy {
    /// Render the fallback text for `key`
    pub fn render(&self, key: &str) -> String {
        match self {
            Self::LiteralKey => key.to_string(),
            Self::Blank => String::new(),
            Self::Placeholder(template) => template.replace("{key}", key),
        }
    }
}

/// Cache of resource trees keyed by locale
pub struct ResourceStore {
    provider: Arc<dyn ResourceProvider>,
    trees: Arc<ArcSwap<TreeMap>>,
    in_flight: Arc<Mutex<HashMap<LocaleCode, LoadFuture>>>,
    policy: MissingKeyPolicy,
    warned: DashSet<(LocaleCode, String)>,
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("loaded", &self.loaded_locales())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ResourceStore {
    /// Create an empty store reading from `provider`
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self::with_policy(provider, MissingKeyPolicy::default())
    }

    /// Create an empty store with a non-default missing-key policy
    pub fn with_policy(provider: Arc<dyn ResourceProvider>, policy: MissingKeyPolicy) -> Self {
        Self {
            provider,
            trees: Arc::new(ArcSwap::from_pointee(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            policy,
            warned: DashSet::new(),
        }
    }

    /// The configured missing-key policy
    pub fn policy(&self) -> &MissingKeyPolicy {
        &self.policy
    }

    /// Fetch `locale` from the provider and publish the tree
    ///
    /// Joins a fetch already running for the same locale instead of starting
    /// another one.
    #[instrument(skip(self), fields(locale = %locale))]
    pub async fn load(&self, locale: &LocaleCode) -> I18nResult<()> {
        let fetch = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(locale.clone())
                .or_insert_with(|| self.start_fetch(locale.clone()))
                .clone()
        };

        match fetch.await {
            Ok(_) => Ok(()),
            Err(shared) => Err(match Arc::try_unwrap(shared) {
                Ok(err) => err,
                Err(shared) => match &*shared {
                    I18nError::ResourceLoadFailure { reason, .. } => {
                        I18nError::load_failure(locale.as_str(), reason)
                    }
                    other => I18nError::load_failure(locale.as_str(), other),
                },
            }),
        }
    }

    fn start_fetch(&self, locale: LocaleCode) -> LoadFuture {
        let provider = Arc::clone(&self.provider);
        let trees = Arc::clone(&self.trees);
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            let result = provider.fetch(&locale).await;
            let outcome = match result {
                Ok(tree) => {
                    let tree = Arc::new(tree);
                    trees.rcu(|current| {
                        let mut next = TreeMap::clone(current);
                        next.insert(locale.clone(), Arc::clone(&tree));
                        next
                    });
                    info!("Loaded {} strings for locale {}", tree.len(), locale);
                    Ok(tree)
                }
                Err(e) => {
                    error!("Failed to load resources for {}: {}", locale, e);
                    Err(Arc::new(e))
                }
            };
            // Publish before releasing the slot so a new caller sees the tree
            in_flight.lock().remove(&locale);
            outcome
        }
        .boxed()
        .shared()
    }

    /// Load `locale` unless a tree is already cached
    pub async fn ensure_loaded(&self, locale: &LocaleCode) -> I18nResult<()> {
        if self.is_loaded(locale) {
            debug!("Resources for {} already cached", locale);
            return Ok(());
        }
        self.load(locale).await
    }

    /// Whether a tree is cached for `locale`
    pub fn is_loaded(&self, locale: &LocaleCode) -> bool {
        self.trees.load().contains_key(locale)
    }

    /// Cached locales, sorted
    pub fn loaded_locales(&self) -> Vec<LocaleCode> {
        let mut locales: Vec<_> = self.trees.load().keys().cloned().collect();
        locales.sort();
        locales
    }

    /// The cached tree for `locale`
    pub fn tree(&self, locale: &LocaleCode) -> Option<Arc<ResourceTree>> {
        self.trees.load().get(locale).cloned()
    }

    /// Drop the cached tree for `locale`
    pub fn evict(&self, locale: &LocaleCode) -> bool {
        let mut removed = false;
        self.trees.rcu(|current| {
            let mut next = TreeMap::clone(current);
            removed = next.remove(locale).is_some();
            next
        });
        self.warned.retain(|(warned_locale, _)| warned_locale != locale);
        removed
    }

    /// Whether `key_path` resolves to a string in the cached `locale` tree
    pub fn has_key(&self, locale: &LocaleCode, key_path: &str) -> bool {
        self.trees
            .load()
            .get(locale)
            .is_some_and(|tree| tree.contains(key_path))
    }

    /// Resolve `key_path` in `locale`, then in `default_locale`
    ///
    /// Leaf hits are interpolated with `params`. A total miss renders the
    /// missing-key policy. Never fails.
    pub fn resolve(
        &self,
        locale: &LocaleCode,
        key_path: &str,
        default_locale: &LocaleCode,
        params: &Params,
    ) -> String {
        let trees = self.trees.load();
        let lookup = |code: &LocaleCode| {
            trees
                .get(code)
                .and_then(|tree| tree.lookup(key_path).found())
        };

        let template = lookup(locale).or_else(|| {
            if locale == default_locale {
                return None;
            }
            debug!("Key '{}' not in {}, trying {}", key_path, locale, default_locale);
            lookup(default_locale)
        });

        match template {
            Some(template) => {
                let rendered = interpolate(template, params);
                for name in &rendered.missing {
                    let err = I18nError::InterpolationParamMissing {
                        key: key_path.to_string(),
                        name: name.clone(),
                    };
                    debug!("{}", err);
                }
                rendered.text
            }
            None => {
                if self.warned.insert((locale.clone(), key_path.to_string())) {
                    let err = I18nError::MissingTranslationKey {
                        locale: locale.to_string(),
                        key: key_path.to_string(),
                    };
                    warn!("{}", err);
                }
                self.policy.render(key_path)
            }
        }
    }
}

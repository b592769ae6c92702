//! # kotoba I18n
//!
//! Locale detection, cached resource resolution and differential
//! synchronization of a UI tree with the active locale.
//!
//! The [`Localizer`] is built once by the host and shared. It detects the
//! locale through an ordered cascade of signals, loads the matching
//! [`ResourceTree`] through a pluggable [`ResourceProvider`], and keeps any
//! attached [`UiTreeSynchronizer`] up to date.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod detector;
pub mod dom;
pub mod error;
pub mod locale;
pub mod localizer;
pub mod markers;
pub mod preference;
pub mod provider;
pub mod render_cache;
pub mod resource;
pub mod store;
pub mod sync;
pub mod watcher;

pub use detector::{
    DetectionDecision, DetectionReport, DetectionSource, EnvironmentSource, ExplicitOverride,
    LanguageDetector, PersistedPreferenceSource, PlatformLocaleSource, PreferredLanguagesSource,
    SignalOutcome, SignalReading, StaticSource,
};
pub use dom::{Document, Element, MutationBatch, WeakElement};
pub use error::{I18nError, I18nResult};
pub use locale::{LocaleCode, LocaleSet};
pub use localizer::{LocaleChanged, Localizer, LocalizerBuilder, LocalizerState, SetLocaleOutcome};
pub use markers::{MarkerBinding, MarkerVocabulary, Slot};
pub use preference::{JsonFilePreferenceStore, MemoryPreferenceStore, PersistedPreference, PreferenceStore};
pub use provider::{DirectoryProvider, EmbeddedProvider, RemoteProvider, ResourceProvider};
pub use render_cache::RenderCache;
pub use resource::{interpolate, Interpolated, Lookup, Params, ResourceNode, ResourceTree};
pub use store::{MissingKeyPolicy, ResourceStore};
pub use sync::{SyncReport, TextSource, UiTreeSynchronizer};
pub use watcher::{BatchCallback, ChangeWatcher, DocumentWatcher, NoopWatcher};

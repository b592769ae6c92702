//! Differential application of translated strings to the UI tree
//!
//! Every marked element is resolved through a [`TextSource`] and written only
//! when the result differs from what this synchronizer last wrote there. A
//! failing binding is logged and counted; the rest of the batch continues.

use crate::dom::{Document, Element, MutationBatch};
use crate::error::{I18nError, I18nResult};
use crate::markers::{MarkerBinding, MarkerVocabulary};
use crate::render_cache::RenderCache;
use crate::resource::Params;
use crate::watcher::{BatchCallback, ChangeWatcher, DocumentWatcher};
use parking_lot::Mutex;
use std::ops::AddAssign;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Produces the display string for a key
pub trait TextSource: Send + Sync {
    /// Render `key` with `params`; never fails
    fn text(&self, key: &str, params: &Params) -> String;
}

impl<F> TextSource for F
where
    F: Fn(&str, &Params) -> String + Send + Sync,
{
    fn text(&self, key: &str, params: &Params) -> String {
        self(key, params)
    }
}

/// Counters from one synchronization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Elements visited
    pub scanned: usize,
    /// Bindings whose slot was written
    pub written: usize,
    /// Bindings already showing the right string
    pub skipped: usize,
    /// Bindings that could not be applied
    pub failed: usize,
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.scanned += other.scanned;
        self.written += other.written;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

struct Applier {
    vocabulary: MarkerVocabulary,
    cache: Mutex<RenderCache>,
}

impl Applier {
    fn apply(&self, root: &Element, source: &dyn TextSource) -> SyncReport {
        let mut report = SyncReport::default();

        for element in root.subtree() {
            report.scanned += 1;
            let bindings = self.vocabulary.bindings_for(&element);
            if bindings.is_empty() {
                continue;
            }

            let params = match self.vocabulary.params_for(&element) {
                Ok(params) => params,
                Err(e) => {
                    warn!("Skipping <{}> with unusable parameters: {}", element.tag(), e);
                    report.failed += bindings.len();
                    continue;
                }
            };

            for binding in bindings {
                match self.apply_binding(&binding, &params, source) {
                    Ok(true) => report.written += 1,
                    Ok(false) => report.skipped += 1,
                    Err(e) => {
                        warn!("{}", e);
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }

    fn apply_binding(
        &self,
        binding: &MarkerBinding,
        params: &Params,
        source: &dyn TextSource,
    ) -> I18nResult<bool> {
        let value = source.text(&binding.key, params);

        if self.cache.lock().get(&binding.element, binding.slot) == Some(value.as_str()) {
            return Ok(false);
        }

        binding
            .slot
            .write(&binding.element, &value)
            .map_err(|e| match e {
                I18nError::UiWriteFailure { slot, reason, .. } => I18nError::UiWriteFailure {
                    key: binding.key.clone(),
                    slot,
                    reason,
                },
                other => other,
            })?;

        self.cache
            .lock()
            .record(&binding.element, binding.slot, &value);
        Ok(true)
    }

    fn handle_batch(&self, batch: MutationBatch, source: &dyn TextSource) -> SyncReport {
        {
            let mut cache = self.cache.lock();
            for removed in &batch.removed {
                let cleared = cache.clear_subtree(removed);
                debug!("Cleared {} cached nodes for removed <{}>", cleared, removed.tag());
            }
        }

        let mut report = SyncReport::default();
        for added in &batch.added {
            report += self.apply(added, source);
        }
        report
    }
}

/// Keeps marked UI nodes in step with the active locale
pub struct UiTreeSynchronizer {
    root: Element,
    applier: Arc<Applier>,
    watcher: Box<dyn ChangeWatcher>,
    observed: Arc<Mutex<SyncReport>>,
}

impl std::fmt::Debug for UiTreeSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiTreeSynchronizer")
            .field("root", &self.root.tag())
            .field("vocabulary", &self.applier.vocabulary)
            .field("observing", &self.is_observing())
            .finish()
    }
}

impl UiTreeSynchronizer {
    /// Create a synchronizer for `root` using `watcher` for live changes
    pub fn new(root: Element, vocabulary: MarkerVocabulary, watcher: Box<dyn ChangeWatcher>) -> Self {
        Self {
            root,
            applier: Arc::new(Applier {
                vocabulary,
                cache: Mutex::new(RenderCache::new()),
            }),
            watcher,
            observed: Arc::new(Mutex::new(SyncReport::default())),
        }
    }

    /// Create a synchronizer for a whole document
    pub fn for_document(document: Arc<Document>, vocabulary: MarkerVocabulary) -> Self {
        let root = document.root().clone();
        Self::new(root, vocabulary, Box::new(DocumentWatcher::new(document)))
    }

    /// Root of the synchronized tree
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Marker vocabulary in use
    pub fn vocabulary(&self) -> &MarkerVocabulary {
        &self.applier.vocabulary
    }

    /// Synchronize every marked element under the root
    #[instrument(skip_all)]
    pub fn full_sync(&self, source: &dyn TextSource) -> SyncReport {
        let pruned = self.applier.cache.lock().prune();
        if pruned > 0 {
            debug!("Pruned {} dropped nodes from the render cache", pruned);
        }

        let report = self.applier.apply(&self.root, source);
        debug!(?report, "Full sync finished");
        report
    }

    /// Synchronize one subtree
    pub fn sync_subtree(&self, root: &Element, source: &dyn TextSource) -> SyncReport {
        self.applier.apply(root, source)
    }

    /// Follow insertions and removals under the root
    ///
    /// Inserted subtrees are synchronized on arrival; removed subtrees are
    /// dropped from the render cache. Calling this while observing is a no-op.
    pub fn start_observing(&self, source: Arc<dyn TextSource>) -> I18nResult<()> {
        if self.watcher.is_running() {
            return Ok(());
        }

        let applier = Arc::clone(&self.applier);
        let observed = Arc::clone(&self.observed);
        let callback: BatchCallback = Arc::new(move |batch| {
            let report = applier.handle_batch(batch, source.as_ref());
            debug!(?report, "Synchronized inserted content");
            *observed.lock() += report;
        });

        self.watcher.start(&self.root, callback)
    }

    /// Stop following changes; no callback runs after this returns
    pub fn stop_observing(&self) {
        self.watcher.stop();
    }

    /// Whether changes are being followed
    pub fn is_observing(&self) -> bool {
        self.watcher.is_running()
    }

    /// Totals accumulated from observed insertions
    pub fn observed_report(&self) -> SyncReport {
        *self.observed.lock()
    }

    /// Forget everything written so the next pass rewrites all bindings
    pub fn reset_cache(&self) {
        self.applier.cache.lock().reset();
    }
}

impl Drop for UiTreeSynchronizer {
    fn drop(&mut self) {
        self.watcher.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::NoopWatcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn upper(key: &str, params: &Params) -> String {
        match params.get("name") {
            Some(name) => format!("{}:{name}", key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    fn synchronizer(root: Element) -> UiTreeSynchronizer {
        UiTreeSynchronizer::new(root, MarkerVocabulary::default(), Box::new(NoopWatcher::new()))
    }

    #[test]
    fn test_full_sync_writes_each_slot() {
        let title = Element::new("h1").with_attribute("data-i18n", "popup.title");
        let search = Element::new("input")
            .with_attribute("data-i18n", "popup.search")
            .with_attribute("data-i18n-title", "popup.search_hint");
        let root = Element::new("body")
            .with_child(title.clone())
            .with_child(search.clone())
            .with_child(Element::new("div"));

        let report = synchronizer(root).full_sync(&upper);

        assert_eq!(report.scanned, 4);
        assert_eq!(report.written, 3);
        assert_eq!(title.text(), "POPUP.TITLE");
        assert_eq!(search.attribute("placeholder").as_deref(), Some("POPUP.SEARCH"));
        assert_eq!(search.attribute("title").as_deref(), Some("POPUP.SEARCH_HINT"));
    }

    #[test]
    fn test_second_sync_writes_nothing() {
        let p = Element::new("p").with_attribute("data-i18n", "a");
        let sync = synchronizer(Element::new("body").with_child(p.clone()));

        sync.full_sync(&upper);
        let second = sync.full_sync(&upper);

        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(p.write_count(), 1);
    }

    #[test]
    fn test_reset_cache_forces_rewrite() {
        let p = Element::new("p").with_attribute("data-i18n", "a");
        let sync = synchronizer(Element::new("body").with_child(p.clone()));

        sync.full_sync(&upper);
        sync.reset_cache();
        assert_eq!(sync.full_sync(&upper).written, 1);
        assert_eq!(p.write_count(), 2);
    }

    #[test]
    fn test_changed_text_is_rewritten() {
        let p = Element::new("p").with_attribute("data-i18n", "a");
        let sync = synchronizer(Element::new("body").with_child(p.clone()));
        let calls = AtomicUsize::new(0);
        let source = move |key: &str, _: &Params| {
            format!("{key}{}", calls.fetch_add(1, Ordering::SeqCst))
        };

        sync.full_sync(&source);
        assert_eq!(sync.full_sync(&source).written, 1);
        assert_eq!(p.text(), "a1");
    }

    #[test]
    fn test_params_from_args_attribute() {
        let p = Element::new("p")
            .with_attribute("data-i18n", "greeting")
            .with_attribute("data-i18n-args", r#"{"name": "Aki"}"#);
        synchronizer(Element::new("body").with_child(p.clone())).full_sync(&upper);
        assert_eq!(p.text(), "GREETING:Aki");
    }

    #[test]
    fn test_failures_are_isolated() {
        let broken_args = Element::new("p")
            .with_attribute("data-i18n", "a")
            .with_attribute("data-i18n-args", "{oops");
        let void = Element::new("br").with_attribute("data-i18n", "b");
        let fine = Element::new("p").with_attribute("data-i18n", "c");
        let root = Element::new("body")
            .with_child(broken_args)
            .with_child(void)
            .with_child(fine.clone());

        let report = synchronizer(root).full_sync(&upper);

        assert_eq!(report.failed, 2);
        assert_eq!(report.written, 1);
        assert_eq!(fine.text(), "C");
    }

    #[test]
    fn test_start_observing_is_idempotent() {
        let sync = synchronizer(Element::new("body"));
        let source: Arc<dyn TextSource> = Arc::new(upper);

        sync.start_observing(Arc::clone(&source)).unwrap();
        sync.start_observing(source).unwrap();
        assert!(sync.is_observing());

        sync.stop_observing();
        sync.stop_observing();
        assert!(!sync.is_observing());
    }
}

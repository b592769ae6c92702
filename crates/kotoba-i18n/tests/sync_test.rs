//! Integration tests for UI-tree synchronization driven by the localizer.

use kotoba_common::test_utils::{init_test_logging, wait_until};
use kotoba_i18n::{
    Document, Element, EmbeddedProvider, LocaleSet, Localizer, MarkerVocabulary, Params,
    SetLocaleOutcome, TextSource, UiTreeSynchronizer,
};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

fn localizer() -> Localizer {
    let provider = EmbeddedProvider::new()
        .with_json(
            "ja",
            r#"{"popup": {"title": "エントリー", "search": "検索", "count": "{count} 件"}}"#,
        )
        .unwrap()
        .with_json(
            "en",
            r#"{"popup": {"title": "Entries", "search": "Search", "count": "{count} entries"}}"#,
        )
        .unwrap();

    Localizer::builder(LocaleSet::new(["ja", "en"], "ja").unwrap(), Arc::new(provider))
        .sources(vec![])
        .build()
}

fn page() -> (Arc<Document>, Element, Element) {
    let title = Element::new("h1").with_attribute("data-i18n", "popup.title");
    let search = Element::new("input")
        .with_attribute("data-i18n", "popup.search")
        .with_attribute("data-i18n-title", "popup.search");
    let root = Element::new("body")
        .with_child(title.clone())
        .with_child(Element::new("main").with_child(search.clone()));
    (Document::new(root), title, search)
}

fn literal(key: &str, _: &Params) -> String {
    key.to_string()
}

#[tokio::test]
async fn test_initialize_renders_attached_tree() {
    init_test_logging();

    let (doc, title, search) = page();
    let localizer = localizer();
    localizer.attach_synchronizer(UiTreeSynchronizer::for_document(
        doc,
        MarkerVocabulary::default(),
    ));
    localizer.initialize().await;

    assert_eq!(title.text(), "エントリー");
    assert_eq!(search.attribute("placeholder").as_deref(), Some("検索"));
    assert_eq!(search.attribute("title").as_deref(), Some("検索"));

    assert_eq!(localizer.set_locale("en", true).await, SetLocaleOutcome::Applied);
    assert_eq!(title.text(), "Entries");
    assert_eq!(search.attribute("placeholder").as_deref(), Some("Search"));
}

#[tokio::test]
async fn test_resync_to_same_strings_writes_nothing() {
    let (doc, title, _) = page();
    let localizer = localizer();
    localizer.attach_synchronizer(UiTreeSynchronizer::for_document(
        doc,
        MarkerVocabulary::default(),
    ));
    localizer.initialize().await;
    let writes = title.write_count();

    let report = localizer.sync_now().unwrap();
    assert_eq!(report.written, 0);
    assert_eq!(report.skipped, 3);
    assert_eq!(title.write_count(), writes);
}

#[tokio::test]
async fn test_inserted_subtree_synced_without_full_rescan() {
    init_test_logging();

    let (doc, title, _) = page();
    let sync = UiTreeSynchronizer::for_document(Arc::clone(&doc), MarkerVocabulary::default());
    let source: Arc<dyn TextSource> = Arc::new(literal);

    let full = sync.full_sync(source.as_ref());
    assert_eq!(full.scanned, 4);
    sync.start_observing(Arc::clone(&source)).unwrap();

    let badge = Element::new("span").with_attribute("data-i18n", "popup.count");
    let card = Element::new("section").with_child(badge.clone());
    doc.append_child(doc.root(), card);

    assert!(wait_until(TIMEOUT, || badge.text() == "popup.count").await);
    let observed = sync.observed_report();
    assert_eq!(observed.scanned, 2);
    assert_eq!(observed.written, 1);
    assert_eq!(title.write_count(), 1);
}

#[tokio::test]
async fn test_inserted_nodes_get_active_locale_and_args() {
    let (doc, _, _) = page();
    let localizer = localizer();
    localizer.attach_synchronizer(UiTreeSynchronizer::for_document(
        Arc::clone(&doc),
        MarkerVocabulary::default(),
    ));
    localizer.initialize().await;
    localizer.start_observing().unwrap();
    localizer.set_locale("en", true).await;

    let badge = Element::new("span")
        .with_attribute("data-i18n", "popup.count")
        .with_attribute("data-i18n-args", r#"{"count": 3}"#);
    doc.append_child(doc.root(), badge.clone());

    assert!(wait_until(TIMEOUT, || badge.text() == "3 entries").await);
}

#[tokio::test]
async fn test_no_sync_after_stop_observing() {
    let (doc, _, _) = page();
    let sync = UiTreeSynchronizer::for_document(Arc::clone(&doc), MarkerVocabulary::default());
    let source: Arc<dyn TextSource> = Arc::new(literal);

    sync.start_observing(Arc::clone(&source)).unwrap();
    sync.stop_observing();
    assert!(!sync.is_observing());

    let late = Element::new("p").with_attribute("data-i18n", "popup.title");
    doc.append_child(doc.root(), late.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(late.text(), "");
    assert_eq!(sync.observed_report().scanned, 0);
}

#[tokio::test]
async fn test_removed_subtree_is_forgotten() {
    let (doc, _, _) = page();
    let sync = UiTreeSynchronizer::for_document(Arc::clone(&doc), MarkerVocabulary::default());
    let source: Arc<dyn TextSource> = Arc::new(literal);
    sync.start_observing(source).unwrap();

    let note = Element::new("p").with_attribute("data-i18n", "popup.title");
    doc.append_child(doc.root(), note.clone());
    assert!(wait_until(TIMEOUT, || note.write_count() == 1).await);

    assert!(doc.remove_child(doc.root(), &note));
    doc.append_child(doc.root(), note.clone());

    // Cache entry was dropped on removal, so re-insertion writes again
    assert!(wait_until(TIMEOUT, || note.write_count() == 2).await);
}

use std::sync::Arc;
use std::time::Duration;

use dockwright::core_types::{Rect, Viewport};
use dockwright::dom_port::{Document, ElementRef, MemoryDocument};
use dockwright::input_locator::AnchorSource;
use dockwright::profile_center::{
    parse_profiles, MemoryProfileStore, ProfileCatalog, PROFILES_STORAGE_KEY,
};
use dockwright::{DockwrightConfig, LifecycleWatcher, PlacementMode, WatcherState};
use tokio::time::sleep;

const CONTROL: &str = "#dockwright-control";

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn empty_catalog() -> Arc<ProfileCatalog> {
    Arc::new(ProfileCatalog::load(Arc::new(MemoryProfileStore::new())))
}

fn watcher(doc: &MemoryDocument, catalog: Arc<ProfileCatalog>) -> LifecycleWatcher {
    LifecycleWatcher::new(Arc::new(doc.clone()), catalog, &DockwrightConfig::default())
}

fn page(url: &str) -> MemoryDocument {
    MemoryDocument::new(url, Viewport::new(1280.0, 900.0))
}

/// A reply form: textarea plus submit button.
fn composer(doc: &MemoryDocument) -> (ElementRef, ElementRef) {
    let form = doc.append_with_rect(&doc.body(), "form", &[], Rect::new(200.0, 680.0, 880.0, 180.0));
    let input = doc.append_with_rect(
        &form,
        "textarea",
        &[("id", "reply"), ("placeholder", "Write a reply")],
        Rect::new(216.0, 696.0, 720.0, 140.0),
    );
    doc.append_with_rect(&form, "button", &[("type", "submit")], Rect::new(952.0, 796.0, 96.0, 40.0));
    (form, input)
}

#[tokio::test(start_paused = true)]
async fn retry_budget_degrades_and_remount_recovers() {
    let doc = page("https://empty.example/");
    let watcher = watcher(&doc, empty_catalog());
    assert!(watcher.start());
    sleep(ms(1)).await;

    for expected in 1..5 {
        assert_eq!(watcher.attempts(), expected);
        assert_eq!(watcher.state(), WatcherState::Detecting);
        sleep(ms(2_000)).await;
    }
    assert_eq!(watcher.attempts(), 5);
    assert_eq!(watcher.state(), WatcherState::Degraded);
    let snapshot = watcher.debug_snapshot();
    assert!(snapshot
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("after 5 attempts"));

    // nothing further is scheduled, even when the page changes
    composer(&doc);
    sleep(ms(60_000)).await;
    assert_eq!(watcher.attempts(), 5);
    assert_eq!(watcher.state(), WatcherState::Degraded);
    assert_eq!(doc.count(CONTROL), 0);

    watcher.remount();
    assert_eq!(watcher.attempts(), 0);
    assert_eq!(watcher.state(), WatcherState::Detecting);
    sleep(ms(1)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    assert_eq!(doc.count(CONTROL), 1);
}

#[tokio::test(start_paused = true)]
async fn success_resets_the_attempt_counter() {
    let doc = page("https://late.example/");
    let watcher = watcher(&doc, empty_catalog());
    watcher.start();
    sleep(ms(2_001)).await;
    assert_eq!(watcher.attempts(), 2);

    composer(&doc);
    sleep(ms(2_000)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    assert_eq!(watcher.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn rerendered_composer_is_repaired_after_debounce() {
    let doc = page("https://notes.example/thread/1");
    let (form, _) = composer(&doc);
    let watcher = watcher(&doc, empty_catalog());
    watcher.start();
    sleep(ms(1)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    let before = watcher.mounter().control().unwrap().key();

    doc.remove(&form);
    let (new_form, _) = composer(&doc);

    sleep(ms(300)).await;
    // still inside the coalescing window
    assert_eq!(watcher.mounter().control().unwrap().key(), before);

    sleep(ms(300)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    let control = watcher.mounter().control().unwrap();
    assert_ne!(control.key(), before);
    assert_eq!(control.parent().unwrap().key(), new_form.key());
    assert_eq!(doc.count(CONTROL), 1);
    assert_eq!(watcher.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn burst_of_mutations_keeps_attachment() {
    let doc = page("https://notes.example/");
    let (form, _) = composer(&doc);
    let watcher = watcher(&doc, empty_catalog());
    watcher.start();
    sleep(ms(1)).await;
    let control = watcher.mounter().control().unwrap();

    for i in 0..20 {
        form.set_attribute("data-tick", &i.to_string());
        sleep(ms(100)).await;
    }
    // every tick restarted the window; the attachment never changed
    sleep(ms(600)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    assert_eq!(watcher.mounter().control().unwrap().key(), control.key());
}

#[tokio::test(start_paused = true)]
async fn racing_remounts_leave_one_control() {
    let doc = page("https://notes.example/");
    let (form, _) = composer(&doc);
    let watcher = watcher(&doc, empty_catalog());
    watcher.start();
    sleep(ms(1)).await;

    doc.remove(&form);
    composer(&doc);
    watcher.remount();
    watcher.remount();
    sleep(ms(1_000)).await;

    assert_eq!(watcher.state(), WatcherState::Mounted);
    assert_eq!(doc.count(CONTROL), 1);
}

#[tokio::test(start_paused = true)]
async fn floating_profile_follows_input_and_repairs_on_loss() {
    let doc = page("https://notes.example/thread/7");
    let (form, input) = composer(&doc);
    let profiles = parse_profiles(
        r#"[{"id":"notes","domainPattern":"notes.example","pathPattern":"/thread/*",
            "selectors":["textarea#reply"],"placementMode":"floating",
            "anchorEdge":"bottom","offsetX":0,"offsetY":8}]"#,
    )
    .unwrap();
    let raw = serde_json::to_string(&profiles).unwrap();
    let catalog = Arc::new(ProfileCatalog::load(Arc::new(MemoryProfileStore::with_entry(
        PROFILES_STORAGE_KEY,
        raw,
    ))));

    let watcher = watcher(&doc, catalog);
    watcher.start();
    sleep(ms(1)).await;

    let snapshot = watcher.debug_snapshot();
    assert_eq!(snapshot.state, WatcherState::Mounted);
    assert_eq!(snapshot.anchor_source, Some(AnchorSource::Profile("notes".into())));
    assert_eq!(snapshot.placement, Some(PlacementMode::Floating));
    assert!(snapshot.tracking);

    let control = watcher.mounter().control().unwrap();
    assert_eq!(control.style("top").as_deref(), Some("844px"));
    assert_eq!(control.style("left").as_deref(), Some("560px"));

    doc.set_rect(&input, Rect::new(216.0, 596.0, 720.0, 140.0));
    sleep(ms(50)).await;
    assert_eq!(control.style("top").as_deref(), Some("744px"));

    doc.remove(&form);
    sleep(ms(50)).await;
    assert!(!watcher.mounter().is_tracking());
    assert_eq!(watcher.state(), WatcherState::Detecting);
    assert_eq!(watcher.attempts(), 1);
    assert_eq!(doc.count(CONTROL), 0);

    composer(&doc);
    sleep(ms(2_000)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    assert_eq!(doc.count(CONTROL), 1);
}

#[tokio::test(start_paused = true)]
async fn reload_profiles_redetects_with_new_set() {
    let doc = page("https://notes.example/thread/9");
    composer(&doc);
    let catalog = empty_catalog();
    let watcher = watcher(&doc, Arc::clone(&catalog));
    watcher.start();
    sleep(ms(1)).await;
    assert_eq!(watcher.debug_snapshot().anchor_source, Some(AnchorSource::Heuristic));

    let profiles = parse_profiles("- id: notes\n  domainPattern: notes.example\n  selectors: ['#reply']\n").unwrap();
    catalog.save(&profiles).unwrap();
    watcher.reload_profiles();
    sleep(ms(1)).await;

    let snapshot = watcher.debug_snapshot();
    assert_eq!(snapshot.state, WatcherState::Mounted);
    assert_eq!(snapshot.profile_id.as_deref(), Some("notes"));
    assert_eq!(doc.count(CONTROL), 1);
}

#[tokio::test(start_paused = true)]
async fn state_changes_are_observable() {
    let doc = page("https://notes.example/");
    composer(&doc);
    let watcher = watcher(&doc, empty_catalog());
    let mut states = watcher.subscribe_state();
    assert_eq!(*states.borrow_and_update(), WatcherState::Idle);

    watcher.start();
    let mounted = states
        .wait_for(|state| *state == WatcherState::Mounted)
        .await
        .map(|state| *state)
        .unwrap();
    assert_eq!(mounted, WatcherState::Mounted);

    watcher.stop();
    assert_eq!(*states.borrow(), WatcherState::Idle);
    assert!(doc.query_selector(CONTROL).unwrap().is_none());
}

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dockwright::core_types::{ControlId, Offset, Rect, Size};
use dockwright::dock_strategies::StrategyRegistry;
use dockwright::dom_port::{Document, MemoryDocument};
use dockwright::input_locator::{AnchorSource, InputLocator};
use dockwright::position_tracker::PositionTracker;
use dockwright::profile_center::{default_profiles, match_profile, MemoryProfileStore, ProfileCatalog};
use dockwright::{AnchorEdge, DockwrightConfig, LifecycleWatcher, Mounter, PlacementMode, WatcherState};
use tokio::time::sleep;

fn fixture(name: &str) -> MemoryDocument {
    let path = Path::new("tests/fixtures").join(name);
    let raw = std::fs::read_to_string(&path).expect("fixture readable");
    MemoryDocument::from_json(&raw).expect("fixture parses")
}

fn mounter(doc: &MemoryDocument) -> Mounter {
    Mounter::new(
        Arc::new(doc.clone()),
        ControlId::default(),
        Arc::new(StrategyRegistry::with_builtin()),
    )
}

#[test]
fn mount_twice_leaves_exactly_one_control() {
    let doc = fixture("notes_page.json");
    let input = doc.query_selector("#reply").unwrap().unwrap();
    let first = mounter(&doc);
    let placement = DockwrightConfig::default().control.default_placement();

    assert!(first.mount(&input, None, &placement));
    assert!(first.mount(&input, None, &placement));
    assert_eq!(doc.count("#dockwright-control"), 1);
    assert_eq!(doc.count("[data-dockwright]"), 1);

    // a second owner of the same id replaces rather than duplicates
    let other = mounter(&doc);
    assert!(other.mount(&input, None, &placement));
    assert_eq!(doc.count("#dockwright-control"), 1);
}

#[test]
fn heuristic_picks_the_reply_box_on_the_notes_page() {
    let doc = fixture("notes_page.json");
    let located = InputLocator::default().locate(&doc, None).unwrap();
    assert_eq!(located.anchor_source, AnchorSource::Heuristic);
    assert_eq!(located.element.attribute("id").as_deref(), Some("reply"));
}

#[test]
fn chatgpt_composer_docks_beside_the_send_wrapper() {
    let doc = fixture("chatgpt_page.json");
    let profiles = default_profiles();
    let profile = match_profile(&doc.url(), &profiles).unwrap();
    assert_eq!(profile.id, "chatgpt");

    let located = InputLocator::default().locate(&doc, Some(profile)).unwrap();
    assert_eq!(located.anchor_source, AnchorSource::Profile("chatgpt".into()));

    let mounter = mounter(&doc);
    assert!(mounter.mount(&located.element, located.anchor.as_ref(), &profile.placement()));
    assert_eq!(mounter.strategy_id().as_deref(), Some("chatgpt"));

    let control = mounter.control().unwrap();
    let toolbar = control.parent().unwrap();
    assert_eq!(
        toolbar.attribute("data-testid").as_deref(),
        Some("composer-trailing-actions")
    );
    let children = toolbar.children();
    let at = children.iter().position(|c| c.key() == control.key()).unwrap();
    assert_eq!(children[at + 1].tag_name(), "span");
    assert_eq!(control.style("display").as_deref(), Some("inline-flex"));
    assert!(mounter.check().is_ok());
}

#[tokio::test(start_paused = true)]
async fn watcher_mounts_on_chatgpt_fixture_with_builtin_profiles() {
    let doc = fixture("chatgpt_page.json");
    let catalog = Arc::new(ProfileCatalog::load(Arc::new(MemoryProfileStore::new())));
    let watcher = LifecycleWatcher::new(Arc::new(doc.clone()), catalog, &DockwrightConfig::default());
    watcher.start();
    sleep(Duration::from_millis(1)).await;

    let snapshot = watcher.debug_snapshot();
    assert_eq!(snapshot.state, WatcherState::Mounted);
    assert_eq!(snapshot.profile_id.as_deref(), Some("chatgpt"));
    assert_eq!(snapshot.strategy.as_deref(), Some("chatgpt"));
    assert_eq!(snapshot.placement, Some(PlacementMode::Docked));

    // the send button disappears: the keyed spot is lost and the control
    // is re-docked at the end of the toolbar
    let send = doc.query_selector("[data-testid='send-button']").unwrap().unwrap();
    doc.remove(&send);
    sleep(Duration::from_millis(1200)).await;
    assert_eq!(watcher.state(), WatcherState::Mounted);
    assert_eq!(doc.count("#dockwright-control"), 1);
    assert_eq!(watcher.debug_snapshot().strategy.as_deref(), Some("chatgpt"));

    let control = doc.query_selector("#dockwright-control").unwrap().unwrap();
    let toolbar = control.parent().unwrap();
    assert_eq!(
        toolbar.attribute("data-testid").as_deref(),
        Some("composer-trailing-actions")
    );
    assert_eq!(toolbar.children().last().unwrap().key(), control.key());
}

#[tokio::test(start_paused = true)]
async fn tracker_applies_the_exact_target_delta() {
    let doc = fixture("notes_page.json");
    let input = doc.query_selector("#reply").unwrap().unwrap();
    let control = doc.append(&doc.body(), "button", &[("id", "follower")]);
    let tracker = PositionTracker::new(
        Arc::new(doc.clone()),
        control,
        Size::square(24.0),
    );
    let handle = tracker.track(Arc::clone(&input), Offset::new(6.0, 0.0), AnchorEdge::Right);
    let before = tracker.last_position().unwrap();

    doc.set_rect(&input, Rect::new(256.0, 646.0, 720.0, 140.0));
    sleep(Duration::from_millis(20)).await;
    let after = tracker.last_position().unwrap();
    assert_eq!(after.left.unwrap() - before.left.unwrap(), 40.0);
    assert_eq!(after.top.unwrap() - before.top.unwrap(), -50.0);

    handle.stop();
    assert!(!handle.is_active());
    doc.set_rect(&input, Rect::new(0.0, 0.0, 720.0, 140.0));
    sleep(Duration::from_millis(20)).await;
    assert_eq!(tracker.last_position(), Some(after));
}

//! Attaching the control to a located input.
//!
//! Docked placement inserts the control at the strategy's insertion point and
//! lets the page lay it out. Floating placement appends it to the body and
//! hands it to a [`PositionTracker`]. Either way at most one control with the
//! configured id is ever attached.

use std::sync::Arc;
use std::time::Duration;

use dock_strategies::{AnchorResult, DockStrategy, SelectorStrategy, StrategyRegistry};
use dockwright_core_types::{ControlId, DockError, InsertionRelation, PlacementMode, Size};
use dom_port::{Document, ElementRef, NodeKey};
use input_locator::is_usable;
use parking_lot::Mutex;
use position_tracker::{PositionTracker, TargetLost, TrackingSpec, DEFAULT_FRAME_INTERVAL};
use profile_center::PlacementConfig;
use tracing::{debug, info, warn};

/// Marker attribute carried by every control this crate creates.
pub const CONTROL_MARKER: &str = "data-dockwright";

struct Mounted {
    control: ElementRef,
    input: ElementRef,
    anchor: Option<NodeKey>,
    placement: PlacementConfig,
    strategy: Arc<dyn DockStrategy>,
    mode: PlacementMode,
    dock: Option<AnchorResult>,
    tracker: Option<PositionTracker>,
}

impl Mounted {
    fn targets(
        &self,
        input: &ElementRef,
        anchor: Option<&ElementRef>,
        placement: &PlacementConfig,
        spot: Option<&AnchorResult>,
    ) -> bool {
        let same_spot = match (&self.dock, spot) {
            (Some(current), Some(next)) => current.same_spot(next),
            (None, None) => true,
            _ => false,
        };
        self.control.is_connected()
            && self.input.key() == input.key()
            && self.anchor == anchor.map(|node| node.key())
            && self.placement == *placement
            && same_spot
    }
}

/// Owns the one control of a document.
pub struct Mounter {
    doc: Arc<dyn Document>,
    control_id: ControlId,
    registry: Arc<StrategyRegistry>,
    frame_interval: Duration,
    state: Mutex<Option<Mounted>>,
    on_target_lost: Mutex<Option<TargetLost>>,
}

impl Mounter {
    pub fn new(doc: Arc<dyn Document>, control_id: ControlId, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            doc,
            control_id,
            registry,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            state: Mutex::new(None),
            on_target_lost: Mutex::new(None),
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Forwarded to every tracker created for floating placement.
    pub fn on_target_lost(&self, callback: TargetLost) {
        *self.on_target_lost.lock() = Some(callback);
    }

    /// Attach the control for `element`.
    ///
    /// Calling again with the same input, anchor and placement while the
    /// control is still attached at the same insertion point is a no-op that
    /// returns `true`. Returns `false` when the control could not be attached.
    pub fn mount(
        &self,
        element: &ElementRef,
        anchor: Option<&ElementRef>,
        placement: &PlacementConfig,
    ) -> bool {
        if !is_usable(element.as_ref()) {
            debug!(target: "dockwright::docking", "refusing to mount on unusable input");
            return false;
        }

        let selector = placement
            .anchor_selector
            .as_deref()
            .filter(|selector| !selector.trim().is_empty());
        // An anchor only counts when there is a selector to find it again by.
        let anchor = match (anchor, selector) {
            (Some(_), None) => {
                debug!(
                    target: "dockwright::docking",
                    "anchor given without a selector, using platform strategy"
                );
                None
            }
            (anchor, _) => anchor,
        };
        let strategy: Arc<dyn DockStrategy> = match (anchor, selector) {
            (Some(_), Some(selector)) => Arc::new(SelectorStrategy::new(selector)),
            _ => self.registry.resolve(placement.platform.as_deref(), selector),
        };
        let spot = match placement.mode {
            PlacementMode::Floating => None,
            PlacementMode::Docked => match anchor {
                Some(anchor) => Some(AnchorResult::append(Arc::clone(anchor))),
                None => strategy.find_anchor(self.doc.as_ref(), Some(element)),
            },
        };

        let mut state = self.state.lock();
        if let Some(current) = state.as_ref() {
            if current.targets(element, anchor, placement, spot.as_ref()) {
                debug!(target: "dockwright::docking", control = %self.control_id, "already mounted");
                return true;
            }
        }
        if let Some(previous) = state.take() {
            self.detach(previous);
        }
        self.remove_strays();

        let control = self.create_control(placement);
        let docked = match (placement.mode, spot) {
            (PlacementMode::Docked, Some(spot)) => self.dock(&control, &strategy, spot),
            _ => None,
        };
        let mounted = match docked {
            Some(dock) => Mounted {
                control,
                input: Arc::clone(element),
                anchor: anchor.map(|node| node.key()),
                placement: placement.clone(),
                strategy,
                mode: PlacementMode::Docked,
                dock: Some(dock),
                tracker: None,
            },
            None => {
                if placement.mode == PlacementMode::Docked && !placement.float_when_undocked {
                    debug!(
                        target: "dockwright::docking",
                        strategy = strategy.id(),
                        "no insertion point and floating disabled"
                    );
                    return false;
                }
                let Some(tracker) = self.float(&control, element, placement) else {
                    return false;
                };
                Mounted {
                    control,
                    input: Arc::clone(element),
                    anchor: anchor.map(|node| node.key()),
                    placement: placement.clone(),
                    strategy,
                    mode: PlacementMode::Floating,
                    dock: None,
                    tracker: Some(tracker),
                }
            }
        };

        info!(
            target: "dockwright::docking",
            control = %self.control_id,
            mode = mounted.mode.name(),
            strategy = mounted.strategy.id(),
            "control mounted"
        );
        *state = Some(mounted);
        true
    }

    /// Remove the control and stop tracking. Safe when nothing is mounted.
    pub fn unmount(&self) -> bool {
        let previous = self.state.lock().take();
        let removed = previous.is_some();
        if let Some(previous) = previous {
            self.detach(previous);
            debug!(target: "dockwright::docking", control = %self.control_id, "control unmounted");
        }
        self.remove_strays();
        removed
    }

    /// Re-validate the current attachment.
    ///
    /// The control must still sit in its container, the input must still be
    /// usable and the strategy must still accept the container.
    pub fn check(&self) -> Result<(), DockError> {
        let state = self.state.lock();
        let Some(mounted) = state.as_ref() else {
            return Err(DockError::NotFound("no control mounted".into()));
        };
        if !mounted.control.is_connected() {
            return Err(DockError::AnchorLost("control detached".into()));
        }
        if let Some(dock) = &mounted.dock {
            let parent = mounted.control.parent().map(|node| node.key());
            if parent != Some(dock.container.key()) {
                return Err(DockError::AnchorLost("control left its container".into()));
            }
        }
        if !is_usable(mounted.input.as_ref()) {
            return Err(DockError::Invalidated("input no longer usable".into()));
        }
        if let Some(dock) = &mounted.dock {
            if !mounted.strategy.validate(dock) {
                return Err(DockError::AnchorLost(format!(
                    "{} container failed validation",
                    mounted.strategy.id()
                )));
            }
        }
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .map(|mounted| mounted.control.is_connected())
            .unwrap_or(false)
    }

    pub fn control(&self) -> Option<ElementRef> {
        self.state.lock().as_ref().map(|mounted| Arc::clone(&mounted.control))
    }

    pub fn input(&self) -> Option<ElementRef> {
        self.state.lock().as_ref().map(|mounted| Arc::clone(&mounted.input))
    }

    pub fn mode(&self) -> Option<PlacementMode> {
        self.state.lock().as_ref().map(|mounted| mounted.mode)
    }

    pub fn strategy_id(&self) -> Option<String> {
        self.state
            .lock()
            .as_ref()
            .map(|mounted| mounted.strategy.id().to_string())
    }

    pub fn is_tracking(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .and_then(|mounted| mounted.tracker.as_ref())
            .map(PositionTracker::is_tracking)
            .unwrap_or(false)
    }

    pub fn tracker(&self) -> Option<PositionTracker> {
        self.state.lock().as_ref().and_then(|mounted| mounted.tracker.clone())
    }

    pub fn control_id(&self) -> &ControlId {
        &self.control_id
    }

    fn create_control(&self, placement: &PlacementConfig) -> ElementRef {
        let control = self.doc.create_element("button");
        control.set_attribute("id", self.control_id.as_str());
        control.set_attribute(CONTROL_MARKER, "control");
        control.set_attribute("type", "button");
        control.set_attribute("aria-label", "Dockwright");
        let side = format!("{}px", placement.size);
        control.set_style("width", Some(&side));
        control.set_style("height", Some(&side));
        control
    }

    fn dock(
        &self,
        control: &ElementRef,
        strategy: &Arc<dyn DockStrategy>,
        spot: AnchorResult,
    ) -> Option<AnchorResult> {
        match self
            .doc
            .insert(control, &spot.container, spot.reference.as_ref(), spot.relation)
        {
            Ok(()) => {
                strategy.apply_style(control, Some(&spot.container));
                debug!(
                    target: "dockwright::docking",
                    strategy = strategy.id(),
                    relation = spot.relation.name(),
                    "control docked"
                );
                Some(spot)
            }
            Err(err) => {
                warn!(
                    target: "dockwright::docking",
                    strategy = strategy.id(),
                    error = %err,
                    "insertion failed"
                );
                None
            }
        }
    }

    fn float(
        &self,
        control: &ElementRef,
        input: &ElementRef,
        placement: &PlacementConfig,
    ) -> Option<PositionTracker> {
        let body = self.doc.body();
        if let Err(err) = self
            .doc
            .insert(control, &body, None, InsertionRelation::Append)
        {
            warn!(target: "dockwright::docking", error = %err, "could not append floating control");
            return None;
        }
        control.set_style("z-index", Some("2147483647"));

        let tracker = PositionTracker::with_frame_interval(
            Arc::clone(&self.doc),
            Arc::clone(control),
            Size::square(placement.size),
            self.frame_interval,
        );
        if let Some(callback) = self.on_target_lost.lock().clone() {
            tracker.on_target_lost(callback);
        }
        tracker.start(TrackingSpec::new(
            Arc::clone(input),
            placement.offset,
            placement.anchor_edge,
        ));
        Some(tracker)
    }

    fn detach(&self, mounted: Mounted) {
        if let Some(tracker) = mounted.tracker {
            tracker.stop();
        }
        self.doc.remove(&mounted.control);
    }

    /// Controls left behind by an earlier owner of the same id.
    fn remove_strays(&self) {
        while let Some(stray) = self.doc.element_by_id(self.control_id.as_str()) {
            self.doc.remove(&stray);
            if stray.is_connected() {
                warn!(target: "dockwright::docking", control = %self.control_id, "stray control could not be removed");
                break;
            }
            debug!(target: "dockwright::docking", control = %self.control_id, "removed stray control");
        }
    }
}

impl Drop for Mounter {
    fn drop(&mut self) {
        if let Some(mounted) = self.state.get_mut().take() {
            if let Some(tracker) = mounted.tracker {
                tracker.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockwright_core_types::{Rect, Viewport};
    use dom_port::MemoryDocument;

    fn page() -> (MemoryDocument, ElementRef, ElementRef) {
        let doc = MemoryDocument::new("https://example.com/", Viewport::new(1280.0, 900.0));
        let body = doc.body();
        let form = doc.append_with_rect(&body, "form", &[], Rect::new(100.0, 600.0, 600.0, 200.0));
        let input = doc.append_with_rect(
            &form,
            "textarea",
            &[("placeholder", "Message")],
            Rect::new(100.0, 600.0, 500.0, 120.0),
        );
        let send = doc.append_with_rect(
            &form,
            "button",
            &[("type", "submit")],
            Rect::new(620.0, 640.0, 40.0, 40.0),
        );
        (doc, input, send)
    }

    fn mounter(doc: &MemoryDocument) -> Mounter {
        Mounter::new(
            Arc::new(doc.clone()),
            ControlId::default(),
            Arc::new(StrategyRegistry::with_builtin()),
        )
    }

    #[test]
    fn docks_before_submit_button() {
        let (doc, input, send) = page();
        let mounter = mounter(&doc);
        assert!(mounter.mount(&input, None, &PlacementConfig::default()));

        let control = mounter.control().unwrap();
        let parent = control.parent().unwrap();
        let siblings: Vec<_> = parent.children().iter().map(|c| c.key()).collect();
        let at = siblings.iter().position(|k| *k == control.key()).unwrap();
        assert_eq!(siblings[at + 1], send.key());
        assert_eq!(mounter.mode(), Some(PlacementMode::Docked));
        assert_eq!(mounter.strategy_id().as_deref(), Some("generic"));
        assert_eq!(control.attribute(CONTROL_MARKER).as_deref(), Some("control"));
        assert!(mounter.check().is_ok());
    }

    #[test]
    fn second_mount_is_a_noop() {
        let (doc, input, _) = page();
        let mounter = mounter(&doc);
        let placement = PlacementConfig::default();
        assert!(mounter.mount(&input, None, &placement));
        let first = mounter.control().unwrap().key();
        assert!(mounter.mount(&input, None, &placement));
        assert_eq!(mounter.control().unwrap().key(), first);
        assert_eq!(doc.count("#dockwright-control"), 1);
    }

    #[test]
    fn floats_when_no_insertion_point() {
        let doc = MemoryDocument::new("https://example.com/", Viewport::new(1280.0, 900.0));
        let input = doc.append_with_rect(&doc.body(), "textarea", &[], Rect::new(10.0, 10.0, 400.0, 100.0));
        let mounter = mounter(&doc);
        assert!(mounter.mount(&input, None, &PlacementConfig::default()));
        assert_eq!(mounter.mode(), Some(PlacementMode::Floating));
        assert!(mounter.is_tracking());
        let control = mounter.control().unwrap();
        assert_eq!(control.style("position").as_deref(), Some("fixed"));
        assert_eq!(control.style("left").as_deref(), Some("418px"));
    }

    #[test]
    fn refuses_when_floating_disabled() {
        let doc = MemoryDocument::new("https://example.com/", Viewport::default());
        let input = doc.append_with_rect(&doc.body(), "textarea", &[], Rect::new(10.0, 10.0, 400.0, 100.0));
        let mounter = mounter(&doc);
        let placement = PlacementConfig {
            float_when_undocked: false,
            ..PlacementConfig::default()
        };
        assert!(!mounter.mount(&input, None, &placement));
        assert!(!mounter.is_mounted());
        assert_eq!(doc.count("#dockwright-control"), 0);
    }

    #[test]
    fn explicit_anchor_appends_into_it() {
        let (doc, input, _) = page();
        let slot = doc.append_with_rect(&doc.body(), "div", &[("id", "slot")], Rect::new(0.0, 0.0, 50.0, 50.0));
        let mounter = mounter(&doc);
        let placement = PlacementConfig {
            anchor_selector: Some("#slot".into()),
            ..PlacementConfig::default()
        };
        assert!(mounter.mount(&input, Some(&slot), &placement));
        let control = mounter.control().unwrap();
        assert_eq!(control.parent().unwrap().key(), slot.key());
        assert_eq!(mounter.strategy_id().as_deref(), Some("selector"));
        assert!(mounter.check().is_ok());
    }

    #[test]
    fn anchor_without_selector_uses_platform_strategy() {
        let (doc, input, send) = page();
        let slot = doc.append_with_rect(&doc.body(), "div", &[("id", "slot")], Rect::new(0.0, 0.0, 50.0, 50.0));
        let mounter = mounter(&doc);
        assert!(mounter.mount(&input, Some(&slot), &PlacementConfig::default()));

        let control = mounter.control().unwrap();
        assert_eq!(control.parent().unwrap().key(), send.parent().unwrap().key());
        assert_eq!(mounter.strategy_id().as_deref(), Some("generic"));
        assert!(slot.children().is_empty());
    }

    #[test]
    fn removes_stray_control_with_same_id() {
        let (doc, input, _) = page();
        let stray = doc.append(&doc.body(), "button", &[("id", "dockwright-control")]);
        let mounter = mounter(&doc);
        assert!(mounter.mount(&input, None, &PlacementConfig::default()));
        assert!(!stray.is_connected());
        assert_eq!(doc.count("#dockwright-control"), 1);
    }

    #[test]
    fn check_reports_lost_container() {
        let (doc, input, send) = page();
        let mounter = mounter(&doc);
        assert!(mounter.mount(&input, None, &PlacementConfig::default()));

        doc.remove(&send);
        let err = mounter.check().unwrap_err();
        assert!(err.needs_immediate_redetect());

        doc.remove(&input);
        let control = mounter.control().unwrap();
        doc.remove(&control);
        assert!(matches!(mounter.check(), Err(DockError::AnchorLost(_))));
    }

    #[test]
    fn check_reports_unusable_input() {
        let (doc, input, _) = page();
        let mounter = mounter(&doc);
        assert!(mounter.mount(&input, None, &PlacementConfig::default()));
        input.set_attribute("disabled", "");
        assert!(matches!(mounter.check(), Err(DockError::Invalidated(_))));
    }

    #[test]
    fn unmount_is_safe_twice() {
        let (doc, input, _) = page();
        let mounter = mounter(&doc);
        assert!(!mounter.unmount());
        assert!(mounter.mount(&input, None, &PlacementConfig::default()));
        assert!(mounter.unmount());
        assert!(!mounter.unmount());
        assert_eq!(doc.count("#dockwright-control"), 0);
        assert!(matches!(mounter.check(), Err(DockError::NotFound(_))));
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dockwright_core_types::{AnchorEdge, Offset, Size};
use dockwright_event_bus::FrameScheduler;
use dom_port::{Document, ElementRef};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::geometry::{compute_position, ControlPosition, TrackingSpec};

/// One animation frame at 60Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Fired once when the tracked target leaves the document.
pub type TargetLost = Arc<dyn Fn() + Send + Sync>;

struct Listener {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

struct TrackerInner {
    doc: Arc<dyn Document>,
    control: ElementRef,
    control_size: Size,
    spec: Mutex<Option<TrackingSpec>>,
    frames: FrameScheduler,
    listener: Mutex<Option<Listener>>,
    on_target_lost: Mutex<Option<TargetLost>>,
    last_position: Mutex<Option<ControlPosition>>,
    recomputes: AtomicU64,
}

/// Pins `control` next to a moving target.
#[derive(Clone)]
pub struct PositionTracker {
    inner: Arc<TrackerInner>,
}

impl PositionTracker {
    pub fn new(doc: Arc<dyn Document>, control: ElementRef, control_size: Size) -> Self {
        Self::with_frame_interval(doc, control, control_size, DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_frame_interval(
        doc: Arc<dyn Document>,
        control: ElementRef,
        control_size: Size,
        frame_interval: Duration,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<TrackerInner>| {
            let weak = weak.clone();
            let frames = FrameScheduler::new(
                frame_interval,
                Arc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.recompute();
                    }
                }),
            );
            TrackerInner {
                doc,
                control,
                control_size,
                spec: Mutex::new(None),
                frames,
                listener: Mutex::new(None),
                on_target_lost: Mutex::new(None),
                last_position: Mutex::new(None),
                recomputes: AtomicU64::new(0),
            }
        });
        Self { inner }
    }

    /// Register the callback for a detached target. Replaces any earlier one.
    pub fn on_target_lost(&self, callback: TargetLost) {
        *self.inner.on_target_lost.lock() = Some(callback);
    }

    /// Begin following `spec.target`; positions the control right away.
    pub fn start(&self, spec: TrackingSpec) {
        debug!(
            target: "dockwright::tracker",
            edge = spec.anchor_edge.name(),
            "tracking started"
        );
        *self.inner.spec.lock() = Some(spec);
        TrackerInner::listen(&self.inner);
        self.inner.recompute();
    }

    /// Follow a new spec; the next frame applies it.
    pub fn update_tracking(&self, spec: TrackingSpec) {
        let was_tracking = self.inner.spec.lock().replace(spec).is_some();
        if was_tracking {
            self.inner.frames.request();
        } else {
            TrackerInner::listen(&self.inner);
            self.inner.recompute();
        }
    }

    pub fn stop(&self) {
        if self.inner.halt() {
            debug!(target: "dockwright::tracker", "tracking stopped");
        }
    }

    /// Convenience: start tracking and hand back a stop handle.
    pub fn track(&self, target: ElementRef, offset: Offset, anchor_edge: AnchorEdge) -> TrackingHandle {
        self.start(TrackingSpec::new(target, offset, anchor_edge));
        TrackingHandle {
            tracker: self.clone(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.inner.spec.lock().is_some()
    }

    pub fn last_position(&self) -> Option<ControlPosition> {
        *self.inner.last_position.lock()
    }

    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.load(Ordering::Relaxed)
    }

    pub fn control(&self) -> &ElementRef {
        &self.inner.control
    }
}

impl TrackerInner {
    fn listen(this: &Arc<Self>) {
        let mut listener = this.listener.lock();
        if listener.is_some() {
            return;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(target: "dockwright::tracker", "no runtime; tracking without layout signals");
                return;
            }
        };

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let weak = Arc::downgrade(this);
        let mut rx = this.doc.subscribe();

        let task = runtime.spawn(async move {
            loop {
                select! {
                    _ = token.cancelled() => break,
                    signal = rx.recv() => {
                        let Some(inner) = weak.upgrade() else { break };
                        match signal {
                            Ok(signal) => {
                                trace!(target: "dockwright::tracker", signal = signal.name(), "layout signal");
                                inner.frames.request();
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                trace!(target: "dockwright::tracker", skipped, "signal stream lagged");
                                inner.frames.request();
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }
            }
            trace!(target: "dockwright::tracker", "signal listener exited");
        });

        *listener = Some(Listener { shutdown, task });
    }

    /// Stop listening and forget the spec. Returns whether anything was running.
    fn halt(&self) -> bool {
        if let Some(listener) = self.listener.lock().take() {
            listener.shutdown.cancel();
            listener.task.abort();
        }
        self.frames.cancel();
        self.spec.lock().take().is_some()
    }

    fn recompute(&self) {
        let Some(spec) = self.spec.lock().clone() else {
            return;
        };

        if !spec.target.is_connected() {
            warn!(target: "dockwright::tracker", "target detached; tracking stopped");
            self.halt();
            let callback = self.on_target_lost.lock().clone();
            if let Some(callback) = callback {
                callback();
            }
            return;
        }

        let position = compute_position(
            spec.target.bounding_box(),
            self.control_size,
            spec.offset,
            spec.anchor_edge,
            self.doc.viewport(),
        );
        apply_position(&self.control, &position);
        *self.last_position.lock() = Some(position);
        self.recomputes.fetch_add(1, Ordering::Relaxed);
        trace!(
            target: "dockwright::tracker",
            left = ?position.left,
            top = ?position.top,
            right = ?position.right,
            bottom = ?position.bottom,
            "control repositioned"
        );
    }
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.shutdown.cancel();
            listener.task.abort();
        }
    }
}

fn apply_position(control: &ElementRef, position: &ControlPosition) {
    control.set_style("position", Some("fixed"));
    for (property, value) in [
        ("left", position.left),
        ("top", position.top),
        ("right", position.right),
        ("bottom", position.bottom),
    ] {
        match value {
            Some(px) => control.set_style(property, Some(&format!("{}px", round_px(px)))),
            None => control.set_style(property, None),
        }
    }
}

fn round_px(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Returned by [`PositionTracker::track`].
#[derive(Clone)]
pub struct TrackingHandle {
    tracker: PositionTracker,
}

impl TrackingHandle {
    pub fn stop(&self) {
        self.tracker.stop();
    }

    pub fn is_active(&self) -> bool {
        self.tracker.is_tracking()
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }
}

//! Detect → mount → observe → repair.
//!
//! State machine:
//! - `Idle --start--> Detecting`
//! - `Detecting --mounted--> Mounted`, resetting the attempt counter
//! - `Detecting --failure--> Detecting` after the retry delay, until the
//!   attempt budget is spent, then `Degraded` with nothing scheduled
//! - `Mounted --check failed--> Detecting` immediately (a repair, not a retry)
//! - any state `--remount--> Detecting` with a fresh budget
//! - navigation re-detects from `Detecting` or `Mounted`; `Degraded` stays
//!   put until an explicit remount
//!
//! Deferred work runs on two [`Debouncer`]s (retry and verify); layout signals
//! arrive through the document's bus. Every cycle step is serialized by one
//! lock so an automatic repair never races a manual remount.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dock_strategies::StrategyRegistry;
use dockwright_core_types::{DockError, InstanceId, WatcherState};
use dockwright_event_bus::{Debouncer, LayoutSignal};
use dom_port::Document;
use input_locator::{AnchorSource, InputLocator};
use parking_lot::Mutex;
use profile_center::{CatalogSource, PlacementConfig, Profile, ProfileCatalog};
use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{DockwrightConfig, WatcherConfig};
use crate::debug::DebugSnapshot;
use crate::mount::Mounter;

struct Listener {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Clone)]
struct Detection {
    profile_id: Option<String>,
    anchor_source: Option<AnchorSource>,
    last_error: Option<String>,
    last_transition: DateTime<Utc>,
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            profile_id: None,
            anchor_source: None,
            last_error: None,
            last_transition: Utc::now(),
        }
    }
}

struct WatcherInner {
    doc: Arc<dyn Document>,
    catalog: Arc<ProfileCatalog>,
    locator: InputLocator,
    mounter: Mounter,
    config: WatcherConfig,
    default_placement: PlacementConfig,
    instance: InstanceId,
    state: watch::Sender<WatcherState>,
    attempts: AtomicU32,
    retry: Debouncer,
    verify: Debouncer,
    listener: Mutex<Option<Listener>>,
    cycle: Mutex<()>,
    detection: Mutex<Detection>,
}

/// Keeps one control attached to the best input of a document.
#[derive(Clone)]
pub struct LifecycleWatcher {
    inner: Arc<WatcherInner>,
}

impl LifecycleWatcher {
    pub fn new(doc: Arc<dyn Document>, catalog: Arc<ProfileCatalog>, config: &DockwrightConfig) -> Self {
        Self::with_registry(doc, catalog, Arc::new(StrategyRegistry::with_builtin()), config)
    }

    pub fn with_registry(
        doc: Arc<dyn Document>,
        catalog: Arc<ProfileCatalog>,
        registry: Arc<StrategyRegistry>,
        config: &DockwrightConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<WatcherInner>| {
            let mounter = Mounter::new(Arc::clone(&doc), config.control.control_id(), registry)
                .with_frame_interval(config.tracker.frame_interval());
            let weak = weak.clone();
            mounter.on_target_lost(Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    debug!(target: "dockwright::watcher", "tracked input lost");
                    WatcherInner::schedule_verify(&inner, Duration::ZERO);
                }
            }));
            let (state, _rx) = watch::channel(WatcherState::Idle);
            WatcherInner {
                doc,
                catalog,
                locator: InputLocator::new(config.heuristic.clone()),
                mounter,
                config: config.watcher.clone(),
                default_placement: config.control.default_placement(),
                instance: InstanceId::new(),
                state,
                attempts: AtomicU32::new(0),
                retry: Debouncer::new("watcher.retry"),
                verify: Debouncer::new("watcher.verify"),
                listener: Mutex::new(None),
                cycle: Mutex::new(()),
                detection: Mutex::new(Detection::default()),
            }
        });
        Self { inner }
    }

    /// Leave `Idle` and schedule the first detection. No-op in any other state.
    pub fn start(&self) -> bool {
        {
            let _cycle = self.inner.cycle.lock();
            if self.state() != WatcherState::Idle {
                debug!(target: "dockwright::watcher", state = %self.state(), "start ignored");
                return false;
            }
            self.inner.attempts.store(0, Ordering::Relaxed);
            self.inner.transition(WatcherState::Detecting);
            WatcherInner::listen(&self.inner);
        }
        WatcherInner::schedule_detect(&self.inner, Duration::ZERO);
        true
    }

    /// Force a full re-detection with a fresh attempt budget, from any state.
    pub fn remount(&self) {
        WatcherInner::remount(&self.inner);
    }

    /// Cancel timers and listeners, remove the control, return to `Idle`.
    pub fn stop(&self) {
        let _cycle = self.inner.cycle.lock();
        self.inner.stop_listening();
        self.inner.retry.cancel();
        self.inner.verify.cancel();
        self.inner.mounter.unmount();
        self.inner.attempts.store(0, Ordering::Relaxed);
        self.inner.transition(WatcherState::Idle);
    }

    /// Re-read the profile store; a running watcher re-detects against it.
    pub fn reload_profiles(&self) -> CatalogSource {
        let source = self.inner.catalog.reload();
        if self.state() != WatcherState::Idle {
            WatcherInner::remount(&self.inner);
        }
        source
    }

    pub fn state(&self) -> WatcherState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.inner.state.subscribe()
    }

    /// Consecutive failed detections since the last success or remount.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    pub fn mounter(&self) -> &Mounter {
        &self.inner.mounter
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.inner.instance
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let inner = &self.inner;
        let detection = inner.detection.lock().clone();
        DebugSnapshot {
            instance_id: inner.instance.clone(),
            url: inner.doc.url(),
            state: self.state(),
            attempts: self.attempts(),
            max_attempts: inner.config.max_attempts,
            profile_id: detection.profile_id,
            anchor_source: detection.anchor_source,
            strategy: inner.mounter.strategy_id(),
            placement: inner.mounter.mode(),
            control_attached: inner.mounter.is_mounted(),
            tracking: inner.mounter.is_tracking(),
            last_error: detection.last_error,
            last_transition: detection.last_transition,
        }
    }
}

impl WatcherInner {
    fn transition(&self, next: WatcherState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            self.detection.lock().last_transition = Utc::now();
            info!(
                target: "dockwright::watcher",
                instance = %self.instance.0,
                from = previous.name(),
                to = next.name(),
                "state changed"
            );
        }
    }

    fn current(&self) -> WatcherState {
        *self.state.borrow()
    }

    fn remount(this: &Arc<Self>) {
        {
            let _cycle = this.cycle.lock();
            this.retry.cancel();
            this.verify.cancel();
            this.attempts.store(0, Ordering::Relaxed);
            this.detection.lock().last_error = None;
            this.transition(WatcherState::Detecting);
            Self::listen(this);
        }
        info!(target: "dockwright::watcher", "remount requested");
        Self::schedule_detect(this, Duration::ZERO);
    }

    fn schedule_detect(this: &Arc<Self>, delay: Duration) {
        let weak = Arc::downgrade(this);
        let scheduled = this.retry.schedule(delay, move || {
            if let Some(inner) = weak.upgrade() {
                Self::detect(&inner);
            }
        });
        if !scheduled {
            if delay.is_zero() {
                Self::detect(this);
            } else {
                warn!(target: "dockwright::watcher", "no runtime; retry not scheduled");
            }
        }
    }

    fn schedule_verify(this: &Arc<Self>, delay: Duration) {
        let weak = Arc::downgrade(this);
        this.verify.schedule(delay, move || {
            if let Some(inner) = weak.upgrade() {
                Self::verify(&inner);
            }
        });
    }

    fn detect(this: &Arc<Self>) {
        let _cycle = this.cycle.lock();
        if this.current() != WatcherState::Detecting {
            trace!(target: "dockwright::watcher", state = %this.current(), "stale detection skipped");
            return;
        }
        Self::run_detection(this);
    }

    /// Caller holds the cycle lock.
    fn run_detection(this: &Arc<Self>) {
        let url = this.doc.url();
        let profile: Option<Profile> = this.catalog.resolve(&url).map(|(tier, profile)| {
            debug!(
                target: "dockwright::watcher",
                profile = %profile.id,
                tier = tier.name(),
                "profile matched"
            );
            profile
        });

        let outcome = this
            .locator
            .try_locate(this.doc.as_ref(), profile.as_ref())
            .and_then(|found| {
                let placement = profile
                    .as_ref()
                    .map(Profile::placement)
                    .unwrap_or_else(|| this.default_placement.clone());
                if this.mounter.mount(&found.element, found.anchor.as_ref(), &placement) {
                    Ok(found)
                } else {
                    Err(DockError::NotFound("no attachment point for located input".into()))
                }
            });

        match outcome {
            Ok(found) => {
                {
                    let mut detection = this.detection.lock();
                    detection.profile_id = found.anchor_source.profile_id().map(str::to_string);
                    detection.anchor_source = Some(found.anchor_source.clone());
                    detection.last_error = None;
                }
                this.attempts.store(0, Ordering::Relaxed);
                this.transition(WatcherState::Mounted);
                info!(
                    target: "dockwright::watcher",
                    source = %found.anchor_source,
                    url = %url,
                    "input located and control mounted"
                );
            }
            Err(err) => Self::record_failure(this, err),
        }
    }

    fn record_failure(this: &Arc<Self>, err: DockError) {
        let attempts = this.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let max = this.config.max_attempts;
        if attempts >= max {
            let exhausted = DockError::RetryExhausted { attempts };
            warn!(
                target: "dockwright::watcher",
                error = %exhausted,
                cause = %err,
                "giving up until remount"
            );
            this.detection.lock().last_error = Some(exhausted.to_string());
            this.retry.cancel();
            this.verify.cancel();
            this.mounter.unmount();
            this.transition(WatcherState::Degraded);
        } else {
            debug!(
                target: "dockwright::watcher",
                attempt = attempts,
                max,
                kind = err.kind(),
                error = %err,
                "detection failed; retrying"
            );
            this.detection.lock().last_error = Some(err.to_string());
            Self::schedule_detect(this, this.config.retry_delay());
        }
    }

    /// Debounced re-check while mounted; failure repairs right away.
    fn verify(this: &Arc<Self>) {
        let _cycle = this.cycle.lock();
        if this.current() != WatcherState::Mounted {
            return;
        }
        match this.mounter.check() {
            Ok(()) => trace!(target: "dockwright::watcher", "attachment still valid"),
            Err(err) => {
                info!(
                    target: "dockwright::watcher",
                    kind = err.kind(),
                    error = %err,
                    "attachment invalidated; repairing"
                );
                this.detection.lock().last_error = Some(err.to_string());
                this.mounter.unmount();
                this.transition(WatcherState::Detecting);
                Self::run_detection(this);
            }
        }
    }

    fn on_signal(this: &Arc<Self>, signal: &LayoutSignal) {
        match signal {
            LayoutSignal::Navigation(url) => match this.current() {
                // Degraded waits for an explicit remount.
                WatcherState::Idle | WatcherState::Degraded => {
                    debug!(target: "dockwright::watcher", url = %url, state = %this.current(), "navigation ignored");
                }
                _ => {
                    info!(target: "dockwright::watcher", url = %url, "navigation; re-detecting");
                    Self::remount(this);
                }
            },
            _ => {
                if this.current() == WatcherState::Mounted {
                    Self::schedule_verify(this, this.config.mutation_debounce());
                }
            }
        }
    }

    fn listen(this: &Arc<Self>) {
        let mut listener = this.listener.lock();
        if listener.is_some() {
            return;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(target: "dockwright::watcher", "no runtime; layout signals ignored");
                return;
            }
        };

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let weak = Arc::downgrade(this);
        let mut rx = this.doc.subscribe();

        let task = runtime.spawn(async move {
            debug!(target: "dockwright::watcher", "signal listener started");
            loop {
                select! {
                    _ = token.cancelled() => break,
                    signal = rx.recv() => {
                        let Some(inner) = weak.upgrade() else { break };
                        match signal {
                            Ok(signal) => {
                                trace!(target: "dockwright::watcher", signal = signal.name(), "layout signal");
                                Self::on_signal(&inner, &signal);
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                trace!(target: "dockwright::watcher", skipped, "signal stream lagged");
                                Self::on_signal(&inner, &LayoutSignal::Mutation);
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }
            }
            debug!(target: "dockwright::watcher", "signal listener exited");
        });

        *listener = Some(Listener { shutdown, task });
    }

    fn stop_listening(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.shutdown.cancel();
            listener.task.abort();
        }
    }
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

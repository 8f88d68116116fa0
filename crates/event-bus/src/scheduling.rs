//! Coalescing timers.
//!
//! [`Debouncer`] is last-write-wins: scheduling again cancels the pending run.
//! [`FrameScheduler`] behaves like `requestAnimationFrame`: any number of
//! requests inside one frame produce a single run at the end of the frame.
//!
//! Both require a tokio runtime; outside one, scheduling is refused and logged
//! instead of panicking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Trailing-edge debounce for one logical operation.
pub struct Debouncer {
    label: &'static str,
    slot: Arc<Mutex<Slot>>,
    exec: Arc<Mutex<()>>,
}

impl Debouncer {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            slot: Arc::new(Mutex::new(Slot::default())),
            exec: Arc::new(Mutex::new(())),
        }
    }

    /// Run `task` after `delay`, replacing any run that has not fired yet.
    ///
    /// Returns `false` when no runtime is available to host the timer.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(target: "dockwright::scheduling", label = self.label, "no runtime; dropping scheduled task");
                return false;
            }
        };

        let mut slot = self.slot.lock();
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        if let Some(previous) = slot.pending.take() {
            trace!(target: "dockwright::scheduling", label = self.label, "superseding pending run");
            previous.abort();
        }

        let shared = Arc::clone(&self.slot);
        let exec = Arc::clone(&self.exec);
        let label = self.label;
        slot.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.lock();
                if slot.generation != generation {
                    return;
                }
                slot.pending = None;
            }
            let _running = exec.lock();
            trace!(target: "dockwright::scheduling", label, "debounced run");
            task();
        }));
        true
    }

    /// Drop the pending run, if any.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One run per frame, however many requests arrive during it.
pub struct FrameScheduler {
    interval: Duration,
    callback: Arc<dyn Fn() + Send + Sync>,
    pending: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FrameScheduler {
    pub fn new(interval: Duration, callback: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            interval,
            callback,
            pending: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Request a run at the end of the current frame.
    ///
    /// Returns `true` when this request opened a new frame, `false` when it
    /// was folded into one already pending (or no runtime is available).
    pub fn request(&self) -> bool {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(target: "dockwright::scheduling", "no runtime; frame request dropped");
                return false;
            }
        };
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }

        let pending = Arc::clone(&self.pending);
        let callback = Arc::clone(&self.callback);
        let interval = self.interval;
        let task = runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            pending.store(false, Ordering::Release);
            callback();
        });
        *self.handle.lock() = Some(task);
        true
    }

    pub fn cancel(&self) {
        if let Some(task) = self.handle.lock().take() {
            task.abort();
        }
        self.pending.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn debouncer_keeps_only_latest_run() {
        let debouncer = Debouncer::new("test");
        let hits = Arc::new(Mutex::new(Vec::new()));
        for value in 0..3 {
            let hits = Arc::clone(&hits);
            debouncer.schedule(Duration::from_millis(500), move || hits.lock().push(value));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*hits.lock(), vec![2]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_debounce_never_fires() {
        let debouncer = Debouncer::new("test");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        debouncer.schedule(Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn schedule_outside_runtime_is_refused() {
        let debouncer = Debouncer::new("test");
        assert!(!debouncer.schedule(Duration::from_millis(1), || {}));
    }

    #[tokio::test(start_paused = true)]
    async fn frame_scheduler_folds_requests() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let frames = FrameScheduler::new(
            Duration::from_millis(16),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(frames.request());
        assert!(!frames.request());
        assert!(!frames.request());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert!(frames.request());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}

//! Normalized "layout may have changed" stream.
//!
//! Hosts funnel whatever native observation primitives they have (mutation,
//! resize, intersection, scroll, visibility) into one [`LayoutSignal`] bus.
//! The tracker and the lifecycle watcher only ever subscribe here.

pub mod scheduling;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub use scheduling::{Debouncer, FrameScheduler};

#[derive(Debug, Error, Clone)]
pub enum BusError {
    #[error("no subscribers for signal")]
    NoSubscribers,
}

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

/// Source of a layout change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutSignal {
    /// Subtree or attribute mutation.
    Mutation,
    /// Viewport or element box resize.
    Resize,
    Scroll,
    Intersection,
    /// Page visibility flipped (tab hidden/shown).
    Visibility,
    /// Same-document navigation to a new URL.
    Navigation(String),
}

impl LayoutSignal {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutSignal::Mutation => "mutation",
            LayoutSignal::Resize => "resize",
            LayoutSignal::Scroll => "scroll",
            LayoutSignal::Intersection => "intersection",
            LayoutSignal::Visibility => "visibility",
            LayoutSignal::Navigation(_) => "navigation",
        }
    }
}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), BusError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Simple in-memory bus backed by a broadcast channel.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    /// Synchronous publish for notification handlers; having no listener is not an error here.
    pub fn emit(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), BusError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| BusError::NoSubscribers)
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

pub type LayoutBus = InMemoryBus<LayoutSignal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_signals() {
        let bus: Arc<LayoutBus> = InMemoryBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(LayoutSignal::Resize).await.unwrap();
        assert_eq!(bus.emit(LayoutSignal::Scroll), 1);
        assert_eq!(rx.recv().await.unwrap(), LayoutSignal::Resize);
        assert_eq!(rx.recv().await.unwrap(), LayoutSignal::Scroll);
    }

    #[tokio::test]
    async fn publish_without_subscribers_reports_error() {
        let bus: Arc<LayoutBus> = InMemoryBus::new(1);
        assert!(bus.publish(LayoutSignal::Mutation).await.is_err());
        assert_eq!(bus.emit(LayoutSignal::Mutation), 0);
    }
}

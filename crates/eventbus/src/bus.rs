//! A broadcast-based [`EventBus`]: one concrete [`EventHooks`]
//! implementation that fans lifecycle callbacks out to any number of
//! subscribers (a log sink, a metrics exporter, a websocket push to a
//! UI) instead of wiring each of those up as its own `EventHooks` impl.
//!
//! Delivery is fire-and-forget: if nobody is subscribed, events are
//! simply dropped, and a slow subscriber that falls behind the channel
//! capacity misses events rather than applying backpressure to the
//! scheduler.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::event_hooks::{EventContext, EventHooks};

/// One lifecycle notification, broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ExecutionStarted(EventContext),
    ExecutionProgress(EventContext),
    ExecutionCompleted(EventContext),
    ExecutionFailed(EventContext),
    ExecutionPaused(EventContext),
    NodeStarted(EventContext),
    NodeCompleted(EventContext),
    NodeFailed(EventContext),
}

/// Fan-out delivery for [`Event`]s via [`tokio::sync::broadcast`].
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    emitted: AtomicU64,
}

impl EventBus {
    /// Create a bus with the given per-subscriber channel capacity. Once
    /// a subscriber falls `capacity` events behind, it starts missing
    /// the oldest ones rather than blocking emission.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            emitted: AtomicU64::new(0),
        }
    }

    /// Emit an event to every active subscriber. A no-op if nobody is
    /// listening.
    pub fn emit(&self, event: Event) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        let _ = self.sender.send(event);
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Total events emitted since creation, including ones nobody
    /// received.
    #[must_use]
    pub fn total_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Number of currently active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A subscription handle returned by [`EventBus::subscribe`].
pub struct EventSubscriber {
    receiver: broadcast::Receiver<Event>,
}

impl EventSubscriber {
    /// Wait for the next event. Returns `None` once the bus has been
    /// dropped; transparently skips over a lagged gap rather than
    /// surfacing it as an error.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
impl EventHooks for EventBus {
    async fn on_execution_started(&self, ctx: EventContext) {
        self.emit(Event::ExecutionStarted(ctx));
    }

    async fn on_execution_progress(&self, ctx: EventContext) {
        self.emit(Event::ExecutionProgress(ctx));
    }

    async fn on_execution_completed(&self, ctx: EventContext) {
        self.emit(Event::ExecutionCompleted(ctx));
    }

    async fn on_execution_failed(&self, ctx: EventContext) {
        self.emit(Event::ExecutionFailed(ctx));
    }

    async fn on_execution_paused(&self, ctx: EventContext) {
        self.emit(Event::ExecutionPaused(ctx));
    }

    async fn on_node_started(&self, ctx: EventContext) {
        self.emit(Event::NodeStarted(ctx));
    }

    async fn on_node_completed(&self, ctx: EventContext) {
        self.emit(Event::NodeCompleted(ctx));
    }

    async fn on_node_failed(&self, ctx: EventContext) {
        self.emit(Event::NodeFailed(ctx));
    }
}

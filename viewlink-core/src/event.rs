//! Typed publish/subscribe hub.
//!
//! Producers and consumers are decoupled through an [`EventBus`]: the
//! connection manager publishes, any number of consumers (UI, loggers,
//! tests) subscribe. Built on `tokio::sync::broadcast` so slow
//! consumers lag rather than backpressure the stream pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::frame::BufferedFrame;
use crate::metrics::StreamStats;

// ── EventBus ─────────────────────────────────────────────────────

/// Generic typed broadcast hub.
#[derive(Debug, Clone)]
pub struct EventBus<E> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    /// Create a bus that retains up to `capacity` undelivered events
    /// per subscriber before lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Events published with no subscribers are discarded.
    pub fn publish(&self, event: E) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(64)
    }
}

// ── StreamEvent ──────────────────────────────────────────────────

/// Events published by the streaming client to the presentation layer.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Transport opened and the session is live.
    Connected,
    /// The transport closed; a reconnect may follow.
    Disconnected,
    /// A failure the presentation layer should surface.
    Error { reason: String },
    /// A decoded frame was accepted into the frame store.
    Frame(Arc<BufferedFrame>),
    /// Periodic link-health snapshot.
    Stats(StreamStats),
    /// An automatic reconnect was scheduled.
    ReconnectScheduled { attempt: u32, delay: Duration },
}

/// The bus carrying [`StreamEvent`]s.
pub type StreamBus = EventBus<StreamEvent>;

// ── Tests ────────────────────────────────────────────────────────

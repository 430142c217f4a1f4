//! Event system for host-bound notifications
//!
//! Observers publish on the bus from engine callback threads; the host
//! dispatch layer subscribes and forwards events across the boundary.

pub mod types;

pub use types::HostEvent;

use tokio::sync::broadcast;

/// Default event channel capacity (ring buffer size)
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Event bus for broadcasting host events
///
/// The event bus uses tokio's broadcast channel to distribute events
/// to multiple subscribers. Events are delivered to all active subscribers.
///
/// # Example
///
/// ```no_run
/// use rtc_bridge::events::{EventBus, HostEvent};
/// use rtc_bridge::registry::Handle;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(HostEvent::ConnectionShouldNegotiate {
///     handle: Handle::new(),
/// });
///
/// tokio::spawn(async move {
///     while let Ok(event) = rx.recv().await {
///         println!("{}: {:?}", event.event_name(), event);
///     }
/// });
/// ```
pub struct EventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl EventBus {
    /// Create a new event bus with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub fn publish(&self, event: HostEvent) {
        tracing::trace!("Publishing {} for {}", event.event_name(), event.handle());
        let _ = self.tx.send(event);
    }

    /// Subscribe to events
    ///
    /// Returns a receiver that will receive all future events.
    /// The receiver uses a ring buffer, so if a subscriber falls too far
    /// behind, it will receive a `Lagged` error and miss some events.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

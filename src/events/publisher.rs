use crate::constants::events::DEFAULT_CHANNEL_CAPACITY;
use crate::events::CacheEvent;
use crate::resilience::{CircuitState, CircuitStateListener};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast publisher for cache notifications
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: Arc<broadcast::Sender<PublishedEvent>>,
    /// Shared by every clone so a publisher is subscribed to a breaker at most once
    circuit_forwarder: Arc<CircuitEventForwarder>,
}

/// Turns breaker transitions into circuit events on the publisher's channel.
///
/// Holds the channel weakly: once every clone of the publisher is gone the forwarder goes
/// inactive and breakers drop it.
#[derive(Debug)]
struct CircuitEventForwarder {
    sender: Weak<broadcast::Sender<PublishedEvent>>,
}

impl CircuitStateListener for CircuitEventForwarder {
    fn on_state_change(&self, service_name: &str, state: CircuitState) {
        if let Some(sender) = self.sender.upgrade() {
            send(&sender, CacheEvent::from_circuit_state(service_name, state));
        }
    }

    fn is_active(&self) -> bool {
        self.sender.strong_count() > 0
    }
}

fn send(sender: &broadcast::Sender<PublishedEvent>, event: CacheEvent) {
    let name = event.name();
    let published = PublishedEvent {
        event,
        published_at: chrono::Utc::now(),
    };

    // send() only fails when there are no subscribers, which is fine
    if sender.send(published).is_err() {
        debug!(event = name, "Event published without subscribers");
    }
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: CacheEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl PublishedEvent {
    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let sender = Arc::new(sender);
        Self {
            circuit_forwarder: Arc::new(CircuitEventForwarder {
                sender: Arc::downgrade(&sender),
            }),
            sender,
        }
    }

    /// Publish an event to every current subscriber
    pub fn publish(&self, event: CacheEvent) {
        send(&self.sender, event);
    }

    /// Listener that republishes breaker transitions as circuit events.
    /// Clones of this publisher return the same listener.
    pub fn circuit_listener(&self) -> Arc<dyn CircuitStateListener> {
        self.circuit_forwarder.clone()
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

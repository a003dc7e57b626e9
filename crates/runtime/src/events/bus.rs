//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use super::types::{DiagnosticEvent, LockEvent, ReplicationEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Committed lock transitions for presentation layers
    Lock,
    /// Outbound replication updates
    Replication,
    /// Recoverable inconsistencies and degradation signals
    Diagnostic,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Lock(LockEvent),
    Replication(ReplicationEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Lock(_) => Topic::Lock,
            Event::Replication(_) => Topic::Replication,
            Event::Diagnostic(_) => Topic::Diagnostic,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<RwLock<HashMap<Topic, broadcast::Sender<Event>>>>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let mut channels = HashMap::new();

        // Pre-create channels for each topic
        channels.insert(Topic::Lock, broadcast::channel(capacity).0);
        channels.insert(Topic::Replication, broadcast::channel(capacity).0);
        channels.insert(Topic::Diagnostic, broadcast::channel(capacity).0);

        Self {
            channels: Arc::new(RwLock::new(channels)),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();

        // Use try_read to avoid blocking in async context
        // If we can't get the lock, just skip (events are best-effort)
        match self.channels.try_read() {
            Ok(channels) => {
                if let Some(tx) = channels.get(&topic)
                    && tx.send(event).is_err()
                {
                    // No subscribers for this topic - this is normal, not an error
                    tracing::trace!("No subscribers for topic {:?}", topic);
                }
            }
            Err(_) => {
                // Failed to acquire lock - event bus is likely under heavy contention
                // This is best-effort, so we skip the event
                tracing::debug!("Failed to acquire event bus lock for topic {:?}", topic);
            }
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        // Channels for every topic are created up front, so try_read and the
        // fallback channel only matter under pathological contention.
        match self.channels.try_read() {
            Ok(channels) => match channels.get(&topic) {
                Some(tx) => tx.subscribe(),
                None => broadcast::channel(1).1,
            },
            Err(_) => broadcast::channel(1).1,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

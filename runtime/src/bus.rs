//! Process-local event bus with synchronous fan-out.
//!
//! One [`ProcessEventBus`] is created per application instance and shared by
//! every component in the process. Publishing walks the topic's subscriber
//! list in subscription order and invokes each callback before returning.
//! The registry lock is released before callbacks run, so a subscriber may
//! itself publish without deadlocking.

use seatwise_core::event::SerializedEvent;
use seatwise_core::event_bus::{EventBus, EventBusError, Subscriber, SubscriptionHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<String, Vec<(u64, Arc<Subscriber>)>>,
}

/// Process-wide publish/subscribe bus with named topics.
///
/// Delivery is synchronous and in subscription order. Subscriptions are
/// removed exactly once through the returned [`SubscriptionHandle`].
#[derive(Clone, Default)]
pub struct ProcessEventBus {
    registry: Arc<Mutex<Registry>>,
}

impl ProcessEventBus {
    /// Creates an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of active subscriptions across all topics.
    ///
    /// Teardown code asserts this returns to its pre-mount value, verifying
    /// the 1:1 subscribe/unsubscribe pairing.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock_registry().topics.values().map(Vec::len).sum()
    }

    /// Number of active subscriptions on one topic
    #[must_use]
    pub fn topic_subscriber_count(&self, topic: &str) -> usize {
        self.lock_registry()
            .topics
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// A panicking subscriber must not wedge the bus for everyone else, so
    /// poisoned locks are recovered rather than propagated.
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventBus for ProcessEventBus {
    fn publish(&self, topic: &str, event: &SerializedEvent) -> Result<(), EventBusError> {
        if topic.is_empty() {
            return Err(EventBusError::InvalidTopic(topic.to_string()));
        }

        // Snapshot the subscriber list, then deliver outside the lock so
        // subscribers can publish reentrantly.
        let subscribers: Vec<Arc<Subscriber>> = self
            .lock_registry()
            .topics
            .get(topic)
            .map(|entries| entries.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default();

        tracing::trace!(
            topic = %topic,
            subscribers = subscribers.len(),
            "Publishing event"
        );

        for subscriber in subscribers {
            subscriber(event);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        topic: &str,
        subscriber: Subscriber,
    ) -> Result<SubscriptionHandle, EventBusError> {
        if topic.is_empty() {
            return Err(EventBusError::SubscriptionFailed {
                topic: topic.to_string(),
                reason: "topic name must not be empty".to_string(),
            });
        }

        let id = {
            let mut registry = self.lock_registry();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .topics
                .entry(topic.to_string())
                .or_default()
                .push((id, Arc::new(subscriber)));
            id
        };

        let registry = Arc::clone(&self.registry);
        let topic_name = topic.to_string();
        Ok(SubscriptionHandle::new(move || {
            let mut registry = registry
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(entries) = registry.topics.get_mut(&topic_name) {
                entries.retain(|(entry_id, _)| *entry_id != id);
                if entries.is_empty() {
                    registry.topics.remove(&topic_name);
                }
            }
        }))
    }
}

//! Event bus abstraction for cross-component communication.
//!
//! This module provides the [`EventBus`] trait for publishing and subscribing
//! to events across component boundaries. The bus is process-wide and
//! synchronous: publishing delivers the event, in subscription order, to every
//! subscriber registered on the topic at the moment of the call, before
//! `publish` returns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   publish    ┌─────────────┐   fan-out   ┌──────────────────┐
//! │ Reservation      │─────────────>│  Event Bus  │────────────>│ Booking List     │
//! │ Engine (reducer) │              │  (topics)   │──┐          │ Projection       │
//! └──────────────────┘              └─────────────┘  │          └──────────────────┘
//!          ▲                                         │
//!          └─────────────────────────────────────────┘
//!                 (engines also consume their own topics
//!                  to mirror holds across widget instances)
//! ```
//!
//! # Key Principles
//!
//! - **Synchronous delivery**: subscribers run inside the publishing call
//! - **Named topics**: topic strings are the external wire contract
//! - **Handle-based unsubscribe**: [`subscribe`](EventBus::subscribe) returns a
//!   [`SubscriptionHandle`] that unsubscribes exactly once, on explicit
//!   [`cancel`](SubscriptionHandle::cancel) or on drop
//!
//! Component teardown must cancel every handle it holds; implementations
//! expose subscriber counts so the 1:1 subscribe/unsubscribe pairing can be
//! asserted.

use crate::event::SerializedEvent;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to a topic
    #[error("Subscription failed for topic '{topic}': {reason}")]
    SubscriptionFailed {
        /// The topic that failed to subscribe
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Topic not found or invalid
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
}

/// Callback invoked for every event delivered on a subscribed topic.
///
/// Subscribers must not block: long-running reactions should hand the event
/// off (e.g. onto an action queue) and return.
pub type Subscriber = Box<dyn Fn(&SerializedEvent) + Send + Sync>;

/// Handle owning one subscription.
///
/// Cancelling (or dropping) the handle removes the subscriber from the bus.
/// The cancel closure runs at most once: a second [`cancel`] call, or a drop
/// after an explicit cancel, is a no-op.
///
/// [`cancel`]: SubscriptionHandle::cancel
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Creates a handle wrapping the given unsubscribe closure
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unsubscribe now. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the subscription is still registered
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Trait for event bus implementations.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: effects executing on spawned tasks
/// publish through a shared `Arc<dyn EventBus>`.
///
/// # Reentrancy
///
/// A subscriber may itself publish. Implementations must not hold internal
/// locks while invoking subscribers.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic, delivering synchronously to all current
    /// subscribers of that topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation fails.
    fn publish(&self, topic: &str, event: &SerializedEvent) -> Result<(), EventBusError>;

    /// Subscribe a callback to a single topic.
    ///
    /// Returns a [`SubscriptionHandle`] that removes the subscriber exactly
    /// once, on cancel or drop.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if subscription fails.
    fn subscribe(
        &self,
        topic: &str,
        subscriber: Subscriber,
    ) -> Result<SubscriptionHandle, EventBusError>;
}

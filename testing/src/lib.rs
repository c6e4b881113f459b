//! # Seatwise Testing
//!
//! Testing utilities and helpers for the Seatwise widget architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A recording event bus for asserting on published events
//! - The Given-When-Then [`ReducerTest`] harness and effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use seatwise_testing::{ReducerTest, mocks::test_clock};
//!
//! ReducerTest::new(SeatEngineReducer::new())
//!     .with_env(test_environment())
//!     .given_state(SeatMapState::new())
//!     .when_action(EngineAction::SelectSeat { seat_id })
//!     .then_state(|state| assert!(state.selected.contains(&seat_id)))
//!     .run();
//! ```

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use seatwise_core::event::SerializedEvent;
    use seatwise_core::event_bus::{EventBus, EventBusError, Subscriber, SubscriptionHandle};
    use seatwise_core::environment::Clock;
    use seatwise_runtime::bus::ProcessEventBus;
    use std::sync::{Arc, Mutex};

    pub use seatwise_runtime::storage::MemoryStore;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making hold-expiry logic reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Event bus that records every publish while still delivering to
    /// subscribers.
    ///
    /// Tests assert on [`published`](Self::published) /
    /// [`published_topics`](Self::published_topics) after driving a reducer
    /// through its store.
    #[derive(Clone, Default)]
    pub struct RecordingEventBus {
        inner: ProcessEventBus,
        published: Arc<Mutex<Vec<(String, SerializedEvent)>>>,
    }

    impl RecordingEventBus {
        /// Creates an empty recording bus
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All events published so far, in publish order
        #[must_use]
        pub fn published(&self) -> Vec<(String, SerializedEvent)> {
            self.lock_published().clone()
        }

        /// Topics of all events published so far, in publish order
        #[must_use]
        pub fn published_topics(&self) -> Vec<String> {
            self.lock_published()
                .iter()
                .map(|(topic, _)| topic.clone())
                .collect()
        }

        /// Number of events published on one topic
        #[must_use]
        pub fn count_for_topic(&self, topic: &str) -> usize {
            self.lock_published()
                .iter()
                .filter(|(t, _)| t == topic)
                .count()
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            self.lock_published().clear();
        }

        fn lock_published(
            &self,
        ) -> std::sync::MutexGuard<'_, Vec<(String, SerializedEvent)>> {
            self.published
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    impl EventBus for RecordingEventBus {
        fn publish(&self, topic: &str, event: &SerializedEvent) -> Result<(), EventBusError> {
            self.lock_published()
                .push((topic.to_string(), event.clone()));
            self.inner.publish(topic, event)
        }

        fn subscribe(
            &self,
            topic: &str,
            subscriber: Subscriber,
        ) -> Result<SubscriptionHandle, EventBusError> {
            self.inner.subscribe(topic, subscriber)
        }
    }
}

pub use mocks::{FixedClock, test_clock};

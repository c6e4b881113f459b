//! # Seatwise Runtime
//!
//! Runtime implementation for the Seatwise widget architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling, plus the concrete infrastructure a widget instance
//! runs on:
//!
//! - **Store**: manages state and executes effects with an action feedback loop
//! - **`ProcessEventBus`**: process-wide synchronous pub/sub ([`bus`])
//! - **`JsonFileStore`** / **`MemoryStore`**: durable and session key-value
//!   backends ([`storage`])
//! - **`spawn_interval`**: fixed-cadence action ticker ([`ticker`])
//!
//! ## Example
//!
//! ```ignore
//! use seatwise_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use seatwise_core::effect::{Effect, EventBusOperation};
use seatwise_core::reducer::Reducer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

pub mod bus;
pub mod storage;
pub mod ticker;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

use error::StoreError;

/// Internal: RAII guard that decrements the pending-effect counter on drop
///
/// Ensures the counter is always decremented, even if the effect panics.
struct DecrementGuard(Arc<AtomicUsize>);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StoreInner<S, A, E, R> {
    state: RwLock<S>,
    reducer: R,
    environment: E,
    shutdown: AtomicBool,
    pending_effects: Arc<AtomicUsize>,
    /// Action broadcast channel for observing actions produced by effects.
    ///
    /// All actions produced by effects (delayed releases, publish callbacks)
    /// are broadcast to observers. Initial actions passed to `send` are not.
    action_broadcast: broadcast::Sender<A>,
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (behind `RwLock` for concurrent access)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (with feedback loop)
///
/// Cloning a Store is cheap; clones share the same state and effect tracking.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    inner: Arc<StoreInner<S, A, E, R>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        let (action_broadcast, _) = broadcast::channel(16);

        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                shutdown: AtomicBool::new(false),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }),
        }
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer with (state, action, environment)
    /// 3. Spawns the returned effects (they execute asynchronously and may
    ///    feed further actions back into the store)
    ///
    /// `send` returns after starting effect execution, not after completion;
    /// use [`settled`](Self::settled) to wait for the effect queue to drain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(StoreError::ShutdownInProgress);
        }
        self.process_action(action).await;
        Ok(())
    }

    /// Read a projection of the current state
    pub async fn state<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Subscribe to all actions produced by effects on this store
    ///
    /// Initial actions passed to [`send`](Self::send) are not broadcast; only
    /// the feedback loop is observable here.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.inner.action_broadcast.subscribe()
    }

    /// Number of effects currently in flight
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.inner.pending_effects.load(Ordering::Acquire)
    }

    /// Wait until no effects are in flight.
    ///
    /// Counts every in-flight effect, armed `Delay`s included, so this only
    /// returns promptly once pending timers have fired or been advanced
    /// past. Intended for tests and orderly teardown; polls on a short sleep
    /// so it cooperates with `tokio::time::pause`.
    pub async fn settled(&self) {
        while self.pending_effects() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Initiate graceful shutdown of the store
    ///
    /// Sets the shutdown flag (rejecting new actions), then waits for pending
    /// effects to complete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before
    /// all pending effects complete (a still-armed hold-expiry delay is the
    /// common case; its task dies with the runtime).
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful store shutdown");
        metrics::counter!("store.shutdown.initiated").increment(1);
        self.inner.shutdown.store(true, Ordering::Release);

        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            let pending = self.pending_effects();
            if pending == 0 {
                metrics::counter!("store.shutdown.completed").increment(1);
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::warn!(pending_effects = pending, "Shutdown timed out");
                metrics::counter!("store.shutdown.timeout").increment(1);
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Run the reducer for one action and spawn the resulting effects.
    async fn process_action(&self, action: A) {
        let effects = {
            let mut state = self.inner.state.write().await;
            self.inner
                .reducer
                .reduce(&mut state, action, &self.inner.environment)
        };
        metrics::counter!("store.actions.processed").increment(1);

        for effect in effects {
            self.spawn_effect(effect);
        }
    }

    /// Feed an effect-produced action back into the store.
    ///
    /// Broadcast first so observers see the action even if the reducer drops
    /// it; send failures just mean nobody is listening.
    async fn feed(&self, action: A) {
        let _ = self.inner.action_broadcast.send(action.clone());
        self.process_action(action).await;
    }

    fn spawn_effect(&self, effect: Effect<A>) {
        self.inner.pending_effects.fetch_add(1, Ordering::SeqCst);
        metrics::counter!("store.effects.spawned").increment(1);
        let store = self.clone();
        let guard_counter = Arc::clone(&self.inner.pending_effects);
        tokio::spawn(async move {
            let _guard = DecrementGuard(guard_counter);
            store.run_effect(effect).await;
        });
    }

    /// Execute a single effect. `Parallel` members are spawned as their own
    /// tracked tasks; `Sequential` members are awaited in order.
    async fn run_effect(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {},
            Effect::Parallel(effects) => {
                for effect in effects {
                    self.spawn_effect(effect);
                }
            },
            Effect::Sequential(effects) => {
                for effect in effects {
                    Box::pin(self.run_effect(effect)).await;
                }
            },
            Effect::Delay { duration, action } => {
                tokio::time::sleep(duration).await;
                self.feed(*action).await;
            },
            Effect::Future(future) => {
                if let Some(action) = future.await {
                    self.feed(action).await;
                }
            },
            Effect::PublishEvent(EventBusOperation::Publish {
                event_bus,
                topic,
                event,
                on_success,
                on_error,
            }) => {
                let feedback = match event_bus.publish(&topic, &event) {
                    Ok(()) => on_success(()),
                    Err(error) => {
                        tracing::warn!(topic = %topic, error = %error, "Event publish failed");
                        metrics::counter!("store.publish.failed").increment(1);
                        on_error(error)
                    },
                };
                if let Some(action) = feedback {
                    self.feed(action).await;
                }
            },
        }
    }
}

//! Fixed-cadence action ticker.
//!
//! Drives periodic work (the hold-expiry sweep) by sending a freshly built
//! action into a store on every tick. The ticker stops itself when the store
//! starts rejecting actions at shutdown.

use crate::{Store, error::StoreError};
use seatwise_core::reducer::Reducer;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a running ticker task.
pub struct TickerHandle {
    handle: JoinHandle<()>,
}

impl TickerHandle {
    /// Stop the ticker immediately
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Whether the ticker task has finished or been stopped
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn a task that sends `make_action()` into `store` every `period`.
///
/// The first tick fires one full period after the call. Ticks missed while
/// the process is suspended are skipped, not replayed; the sweep they drive
/// is idempotent, so skipping is safe.
pub fn spawn_interval<S, A, E, R>(
    store: Store<S, A, E, R>,
    period: Duration,
    make_action: impl Fn() -> A + Send + 'static,
) -> TickerHandle
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // interval's first tick completes immediately; consume it so the
        // first action fires one period from now
        interval.tick().await;

        loop {
            interval.tick().await;
            match store.send(make_action()).await {
                Ok(()) => {},
                Err(StoreError::ShutdownInProgress | StoreError::ShutdownTimeout(_)) => {
                    tracing::debug!("Store shut down, stopping ticker");
                    break;
                },
            }
        }
    });

    TickerHandle { handle }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use seatwise_core::SmallVec;
    use seatwise_core::effect::Effect;

    #[derive(Clone, Debug)]
    enum TickAction {
        Tick,
    }

    #[derive(Clone, Debug, Default)]
    struct TickState {
        ticks: u32,
    }

    struct TickEnv;
    struct TickReducer;

    impl Reducer for TickReducer {
        type State = TickState;
        type Action = TickAction;
        type Environment = TickEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            _action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            state.ticks += 1;
            SmallVec::new()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_fires_on_cadence() {
        let store = Store::new(TickState::default(), TickReducer, TickEnv);
        let ticker = spawn_interval(store.clone(), Duration::from_secs(1), || TickAction::Tick);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(store.state(|s| s.ticks).await, 3);

        ticker.stop();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.state(|s| s.ticks).await, 3);
    }
}

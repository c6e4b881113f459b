//! Widget coordinator: wiring and lifecycle for one booking widget instance.
//!
//! One instance corresponds to one browser context: it owns an engine store
//! and a booking-list projection, shares a process-wide bus with whatever
//! else runs in that context, and shares the durable store with every other
//! instance of the application.
//!
//! Mounting subscribes both components to their topics and starts the
//! 1-second expiry sweep; tearing down cancels every subscription exactly
//! once, stops the sweep, and shuts the store down. The subscription count
//! on the bus returns to its pre-mount value after teardown.

use crate::config::Config;
use crate::engine::{EngineAction, EngineEnvironment, SeatEngineReducer, SeatMapState};
use crate::events::{WidgetEvent, topics};
use crate::projections::{BookingListProjection, Projection};
use crate::storage;
use crate::types::{Booking, SeatId, SeatStatus, User};
use seatwise_core::environment::Clock;
use seatwise_core::event_bus::{EventBus, EventBusError, SubscriptionHandle};
use seatwise_core::storage::KeyValueStore;
use seatwise_runtime::error::StoreError;
use seatwise_runtime::ticker::{TickerHandle, spawn_interval};
use seatwise_runtime::Store;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Topics the reservation engine consumes.
const ENGINE_TOPICS: [&str; 6] = [
    topics::USER_LOGGED_IN,
    topics::USER_LOGGED_OUT,
    topics::SEAT_SELECTING,
    topics::SEAT_RELEASED,
    topics::SEAT_CONFLICT,
    topics::TICKET_BOOKED,
];

/// Topics the booking-list projection consumes.
const PROJECTION_TOPICS: [&str; 3] = [
    topics::TICKET_BOOKED,
    topics::USER_LOGGED_IN,
    topics::USER_LOGGED_OUT,
];

/// Errors surfaced by the widget API.
#[derive(Error, Debug)]
pub enum WidgetError {
    /// Bus subscription or publish failed
    #[error(transparent)]
    Bus(#[from] EventBusError),

    /// The underlying store rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),
}

type EngineStore = Store<SeatMapState, EngineAction, EngineEnvironment, SeatEngineReducer>;

/// One mounted booking widget instance.
pub struct BookingWidget {
    store: EngineStore,
    projection: Arc<Mutex<BookingListProjection>>,
    subscriptions: Vec<SubscriptionHandle>,
    ticker: TickerHandle,
    pump: JoinHandle<()>,
}

impl BookingWidget {
    /// Mount a widget instance: load initial state from the stores, wire
    /// both components onto the bus, and start the expiry sweep.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Bus`] if any topic subscription fails.
    pub fn mount(
        config: &Config,
        bus: Arc<dyn EventBus>,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WidgetError> {
        // Initial state from the session identity and the durable mirrors;
        // malformed data has already degraded to empty inside the loaders
        let user = storage::load_session_user(session.as_ref());
        let bookings = storage::load_bookings(durable.as_ref());
        let holds = storage::load_holds(durable.as_ref());
        let state = SeatMapState::from_loaded(user.clone(), &bookings, holds);

        let environment = EngineEnvironment::new(
            clock,
            Arc::clone(&bus),
            Arc::clone(&durable),
            config.total_seats,
            config.reservation_timeout_ms,
        );
        let store = Store::new(state, SeatEngineReducer::new(), environment);

        let projection = Arc::new(Mutex::new(BookingListProjection::new(
            Arc::clone(&durable),
            user,
        )));

        // Bus callbacks must not block, so engine-bound events go through a
        // queue drained by the pump task below, preserving call order
        let (action_tx, mut action_rx) = mpsc::unbounded_channel::<EngineAction>();
        let pump_store = store.clone();
        let pump = tokio::spawn(async move {
            while let Some(action) = action_rx.recv().await {
                tracing::trace!(kind = action.kind(), "Dispatching bus action");
                if pump_store.send(action).await.is_err() {
                    break;
                }
            }
        });

        let mut subscriptions = Vec::with_capacity(ENGINE_TOPICS.len() + PROJECTION_TOPICS.len());

        for topic in ENGINE_TOPICS {
            let tx = action_tx.clone();
            subscriptions.push(bus.subscribe(
                topic,
                Box::new(move |event| match WidgetEvent::from_serialized(event) {
                    Ok(widget_event) => {
                        if let Some(action) = engine_action_for(&widget_event) {
                            let _ = tx.send(action);
                        }
                    },
                    Err(error) => {
                        tracing::warn!(topic = %event.event_type, %error, "Dropping undecodable bus event");
                    },
                }),
            )?);
        }

        for topic in PROJECTION_TOPICS {
            let projection = Arc::clone(&projection);
            subscriptions.push(bus.subscribe(
                topic,
                Box::new(move |event| match WidgetEvent::from_serialized(event) {
                    Ok(widget_event) => {
                        let mut projection = projection
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner);
                        if let Err(error) = projection.handle_event(&widget_event) {
                            tracing::warn!(topic = %event.event_type, %error, "Projection update failed");
                        }
                    },
                    Err(error) => {
                        tracing::warn!(topic = %event.event_type, %error, "Dropping undecodable bus event");
                    },
                }),
            )?);
        }

        let ticker = spawn_interval(store.clone(), config.sweep_interval(), || {
            EngineAction::SweepExpired
        });

        tracing::info!(
            subscriptions = subscriptions.len(),
            "Booking widget mounted"
        );

        Ok(Self {
            store,
            projection,
            subscriptions,
            ticker,
            pump,
        })
    }

    /// Select a seat (toggles an already-selected seat released).
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Store`] if the widget is shutting down.
    pub async fn select_seat(&self, seat_id: SeatId) -> Result<(), WidgetError> {
        self.store.send(EngineAction::SelectSeat { seat_id }).await?;
        Ok(())
    }

    /// Release one of the current user's held seats.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Store`] if the widget is shutting down.
    pub async fn release_seat(&self, seat_id: SeatId) -> Result<(), WidgetError> {
        let Some(user_id) = self.store.state(|s| s.user.as_ref().map(|u| u.user_id.clone())).await
        else {
            return Ok(());
        };
        self.store
            .send(EngineAction::ReleaseSeat { seat_id, user_id })
            .await?;
        Ok(())
    }

    /// Commit the current selection as a booking.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Store`] if the widget is shutting down.
    pub async fn commit_booking(&self) -> Result<(), WidgetError> {
        self.store.send(EngineAction::CommitBooking).await?;
        Ok(())
    }

    /// Derived status of one seat for the current user
    pub async fn seat_status(&self, seat_id: SeatId) -> SeatStatus {
        self.store.state(move |s| s.seat_status(seat_id)).await
    }

    /// The current user's selected seats, in ascending order
    pub async fn selected_seats(&self) -> Vec<SeatId> {
        self.store
            .state(|s| s.selected.iter().copied().collect())
            .await
    }

    /// The current session identity, if any
    pub async fn current_user(&self) -> Option<User> {
        self.store.state(|s| s.user.clone()).await
    }

    /// Bookings visible to the current user, per the projection's role filter
    #[must_use]
    pub fn visible_bookings(&self) -> Vec<Booking> {
        self.projection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .visible_bookings()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of bus subscriptions this instance still holds
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|handle| handle.is_active())
            .count()
    }

    /// Tear the instance down: cancel every subscription exactly once, stop
    /// the sweep, and shut the store down.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Store`] if effects were still pending at the
    /// deadline; an armed hold-expiry timer is the common, harmless case.
    pub async fn teardown(mut self, timeout: Duration) -> Result<(), WidgetError> {
        for handle in &mut self.subscriptions {
            handle.cancel();
        }
        self.ticker.stop();
        self.pump.abort();

        let result = self.store.shutdown(timeout).await;
        tracing::info!("Booking widget torn down");
        result?;
        Ok(())
    }
}

/// Map a consumed bus event onto the engine action that mirrors it.
fn engine_action_for(event: &WidgetEvent) -> Option<EngineAction> {
    match event {
        WidgetEvent::UserLoggedIn(user) => Some(EngineAction::UserLoggedIn { user: user.clone() }),
        WidgetEvent::UserLoggedOut => Some(EngineAction::UserLoggedOut),
        WidgetEvent::SeatSelecting(payload) => Some(EngineAction::HoldObserved {
            seat_id: payload.seat_id,
            user_id: payload.user_id.clone(),
            expires_at: payload.expires_at,
        }),
        WidgetEvent::SeatReleased(payload) => Some(EngineAction::ReleaseObserved {
            seat_id: payload.seat_id,
            user_id: payload.user_id.clone(),
        }),
        WidgetEvent::SeatConflict(payload) => Some(EngineAction::ConflictObserved {
            seat_id: payload.seat_id,
        }),
        WidgetEvent::TicketBooked(payload) => Some(EngineAction::BookingObserved {
            user_id: payload.user_id.clone(),
            seats: payload.seats.clone(),
        }),
        WidgetEvent::Notification(_) => None,
    }
}

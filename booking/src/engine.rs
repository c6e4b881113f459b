//! Seat reservation engine.
//!
//! Mediates seat selection, enforces at-most-one-holder-per-seat, commits
//! bookings, and expires stale holds. Validation happens twice: optimistically
//! at selection time against the in-memory mirror (cheap, may be stale), and
//! authoritatively at commit time against freshly loaded durable state. Only
//! the commit-time check is trusted; other widget instances mutate the
//! durable store out-of-band.
//!
//! Timers are never cancelled. A manual release before the auto-release
//! delay fires is safe because every release carries the holder's identity
//! and is a no-op unless the hold still names that holder.

use crate::events::{
    SeatConflictPayload, SeatReleasedPayload, SeatSelectingPayload, TicketBookedPayload,
    WidgetEvent,
};
use crate::storage;
use crate::types::{Booking, Notification, Permission, SeatHold, SeatId, SeatStatus, User, UserId};
use chrono::{DateTime, Utc};
use seatwise_core::environment::Clock;
use seatwise_core::event_bus::EventBus;
use seatwise_core::reducer::Reducer;
use seatwise_core::storage::KeyValueStore;
use seatwise_core::{SmallVec, effect::Effect, publish_event, smallvec};
use seatwise_macros::Action;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// Seat-map state for one widget instance.
///
/// `booked` and `holds` mirror the durable store; `selected` is this
/// instance's own pending selection. Seat status is always derived, never
/// stored: see [`seat_status`](Self::seat_status).
#[derive(Clone, Debug, Default)]
pub struct SeatMapState {
    /// Current session identity, if logged in
    pub user: Option<User>,
    /// Seats the current user has selected (and holds)
    pub selected: BTreeSet<SeatId>,
    /// Seats permanently booked; only ever grows
    pub booked: BTreeSet<SeatId>,
    /// Active holds keyed by seat, at most one per seat
    pub holds: BTreeMap<SeatId, SeatHold>,
}

impl SeatMapState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the initial state from loaded session identity and durable
    /// mirrors
    #[must_use]
    pub fn from_loaded(
        user: Option<User>,
        bookings: &[Booking],
        holds: BTreeMap<SeatId, SeatHold>,
    ) -> Self {
        Self {
            user,
            selected: BTreeSet::new(),
            booked: storage::booked_seats(bookings),
            holds,
        }
    }

    /// Derived status of one seat, relative to the current user.
    ///
    /// Precedence: booked beats held beats free.
    #[must_use]
    pub fn seat_status(&self, seat_id: SeatId) -> SeatStatus {
        if self.booked.contains(&seat_id) {
            return SeatStatus::Booked;
        }
        match self.holds.get(&seat_id) {
            Some(hold) => {
                if self.is_current_user(&hold.user_id) {
                    SeatStatus::ReservedBySelf
                } else {
                    SeatStatus::ReservedByOther
                }
            },
            None if self.selected.contains(&seat_id) => SeatStatus::ReservedBySelf,
            None => SeatStatus::Free,
        }
    }

    fn is_current_user(&self, user_id: &UserId) -> bool {
        self.user.as_ref().is_some_and(|u| &u.user_id == user_id)
    }
}

// ============================================================================
// Actions (Commands + Consumed Events)
// ============================================================================

/// Actions for the seat reservation engine.
///
/// Commands come from the widget surface; events are consumed from the bus
/// (including the engine's own published events, which keep the mirror
/// consistent without special-casing the originator).
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum EngineAction {
    // Commands
    /// Select a seat, creating a hold. Selecting an already-selected seat
    /// releases it (toggle semantics).
    #[command]
    SelectSeat {
        /// The seat to select
        seat_id: SeatId,
    },

    /// Release a hold, if it still names `user_id`. Shared by user-initiated
    /// release and the auto-release timer.
    #[command]
    ReleaseSeat {
        /// The seat to release
        seat_id: SeatId,
        /// The holder the release is on behalf of
        user_id: UserId,
    },

    /// Commit the current selection as a booking
    #[command]
    CommitBooking,

    /// Remove every hold past its expiry, emitting a release per hold
    #[command]
    SweepExpired,

    // Consumed bus events
    /// Session identity arrived
    #[event]
    UserLoggedIn {
        /// The logged-in user
        user: User,
    },

    /// Session identity cleared
    #[event]
    UserLoggedOut,

    /// Some selector (possibly this instance) placed a hold
    #[event]
    HoldObserved {
        /// The held seat
        seat_id: SeatId,
        /// The holder
        user_id: UserId,
        /// When the hold lapses
        expires_at: DateTime<Utc>,
    },

    /// Some selector released a hold
    #[event]
    ReleaseObserved {
        /// The released seat
        seat_id: SeatId,
        /// The former holder
        user_id: UserId,
    },

    /// A booking was committed somewhere
    #[event]
    BookingObserved {
        /// Who booked
        user_id: UserId,
        /// The seats now permanently booked
        seats: Vec<SeatId>,
    },

    /// A selection was blocked by another user's hold
    #[event]
    ConflictObserved {
        /// The contested seat
        seat_id: SeatId,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the seat reservation engine
#[derive(Clone)]
pub struct EngineEnvironment {
    /// Clock for hold creation and expiry checks
    pub clock: Arc<dyn Clock>,
    /// Bus the engine publishes on
    pub bus: Arc<dyn EventBus>,
    /// Durable store holding the booking list and hold map mirrors
    pub durable: Arc<dyn KeyValueStore>,
    /// Seat ids run 1..=`total_seats`
    pub total_seats: u32,
    /// Hold lifetime in milliseconds
    pub reservation_timeout_ms: u32,
}

impl EngineEnvironment {
    /// Creates a new `EngineEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        bus: Arc<dyn EventBus>,
        durable: Arc<dyn KeyValueStore>,
        total_seats: u32,
        reservation_timeout_ms: u32,
    ) -> Self {
        Self {
            clock,
            bus,
            durable,
            total_seats,
            reservation_timeout_ms,
        }
    }

    fn reservation_timeout(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::from(self.reservation_timeout_ms))
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the seat reservation engine.
///
/// All durable writes happen inside `reduce`, which the store runs behind a
/// write lock: within one process the read-validate-append sequence at
/// commit is atomic. Across processes the last writer wins.
#[derive(Clone, Debug, Default)]
pub struct SeatEngineReducer;

impl SeatEngineReducer {
    /// Creates a new `SeatEngineReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds a publish effect for `event`, degrading encode failures to a
    /// logged no-op.
    fn publish(env: &EngineEnvironment, event: &WidgetEvent) -> Effect<EngineAction> {
        match event.to_serialized() {
            Ok(serialized) => publish_event! {
                bus: env.bus,
                topic: event.topic(),
                event: serialized,
                on_success: || None,
                on_error: |_error| None
            },
            Err(error) => {
                tracing::warn!(topic = event.topic(), %error, "Failed to encode event");
                Effect::None
            },
        }
    }

    fn notify(env: &EngineEnvironment, notification: Notification) -> Effect<EngineAction> {
        Self::publish(env, &WidgetEvent::Notification(notification))
    }

    /// Persist the hold map mirror; storage failures are logged, never fatal.
    fn persist_holds(env: &EngineEnvironment, holds: &BTreeMap<SeatId, SeatHold>) {
        if let Err(error) = storage::save_holds(env.durable.as_ref(), holds) {
            tracing::warn!(%error, "Failed to persist hold map");
        }
    }

    /// Release `seat_id` on behalf of `user_id`.
    ///
    /// Guarded by a freshness check: if the hold no longer names `user_id`
    /// (already released, expired, or re-granted), this is a no-op. That
    /// makes the cancellation-less auto-release timer safe.
    fn release(
        state: &mut SeatMapState,
        env: &EngineEnvironment,
        seat_id: SeatId,
        user_id: UserId,
    ) -> SmallVec<[Effect<EngineAction>; 4]> {
        let still_held = state
            .holds
            .get(&seat_id)
            .is_some_and(|hold| hold.user_id == user_id);
        if !still_held {
            tracing::trace!(%seat_id, %user_id, "Release skipped, hold no longer matches");
            return SmallVec::new();
        }

        state.holds.remove(&seat_id);
        if state.is_current_user(&user_id) {
            state.selected.remove(&seat_id);
        }
        Self::persist_holds(env, &state.holds);

        tracing::debug!(%seat_id, %user_id, "Seat released");
        smallvec![Self::publish(
            env,
            &WidgetEvent::SeatReleased(SeatReleasedPayload { seat_id, user_id }),
        )]
    }

    fn select(
        state: &mut SeatMapState,
        env: &EngineEnvironment,
        seat_id: SeatId,
    ) -> SmallVec<[Effect<EngineAction>; 4]> {
        let Some(user) = state.user.clone() else {
            tracing::trace!(%seat_id, "Selection ignored, nobody logged in");
            return SmallVec::new();
        };
        if !user.has_permission(&Permission::book_tickets()) {
            tracing::debug!(%seat_id, user_id = %user.user_id, "Selection blocked, missing permission");
            return SmallVec::new();
        }
        if !seat_id.in_range(env.total_seats) || state.booked.contains(&seat_id) {
            return SmallVec::new();
        }

        // Toggle: selecting an already-selected seat releases it
        if state.selected.contains(&seat_id) {
            return Self::release(state, env, seat_id, user.user_id);
        }

        // Optimistic conflict check against the (possibly stale) mirror
        if let Some(hold) = state.holds.get(&seat_id) {
            if hold.user_id != user.user_id {
                tracing::debug!(%seat_id, holder = %hold.user_id, "Selection conflicts with existing hold");
                return smallvec![Self::publish(
                    env,
                    &WidgetEvent::SeatConflict(SeatConflictPayload { seat_id }),
                )];
            }
        }

        let now = env.clock.now();
        let expires_at = now + env.reservation_timeout();
        state.selected.insert(seat_id);
        state.holds.insert(
            seat_id,
            SeatHold {
                user_id: user.user_id.clone(),
                expires_at,
            },
        );
        Self::persist_holds(env, &state.holds);

        tracing::debug!(%seat_id, user_id = %user.user_id, %expires_at, "Seat selected");
        smallvec![
            Self::publish(
                env,
                &WidgetEvent::SeatSelecting(SeatSelectingPayload {
                    seat_id,
                    user_id: user.user_id.clone(),
                    timestamp: now,
                    expires_at,
                }),
            ),
            Effect::Delay {
                duration: std::time::Duration::from_millis(u64::from(
                    env.reservation_timeout_ms
                )),
                action: Box::new(EngineAction::ReleaseSeat {
                    seat_id,
                    user_id: user.user_id,
                }),
            },
        ]
    }

    #[allow(clippy::too_many_lines)] // One linear commit sequence reads better unsplit
    fn commit(
        state: &mut SeatMapState,
        env: &EngineEnvironment,
    ) -> SmallVec<[Effect<EngineAction>; 4]> {
        let Some(user) = state.user.clone() else {
            return SmallVec::new();
        };
        if state.selected.is_empty() || !user.has_permission(&Permission::book_tickets()) {
            return SmallVec::new();
        }

        // Authoritative validation against freshly loaded durable state; the
        // in-memory mirror may be stale relative to other widget instances.
        let current_bookings = storage::load_bookings(env.durable.as_ref());
        let booked_now = storage::booked_seats(&current_bookings);
        let latest_holds = storage::load_holds(env.durable.as_ref());

        let conflicts: Vec<SeatId> = state
            .selected
            .iter()
            .copied()
            .filter(|seat_id| {
                booked_now.contains(seat_id)
                    || latest_holds
                        .get(seat_id)
                        .is_some_and(|hold| hold.user_id != user.user_id)
            })
            .collect();

        if !conflicts.is_empty() {
            // Whole commit rejected, selection rolled back; no partial booking
            state.selected.clear();
            let listed = join_seats(&conflicts);
            tracing::info!(seats = %listed, user_id = %user.user_id, "Commit rejected on conflicts");
            return smallvec![Self::notify(
                env,
                Notification::error(format!(
                    "Booking failed. Seats {listed} are already taken."
                )),
            )];
        }

        let booking = Booking {
            user_id: if user.user_id.is_empty() {
                UserId::anonymous()
            } else {
                user.user_id.clone()
            },
            seats: state.selected.iter().copied().collect(),
            timestamp: env.clock.now(),
        };

        // Re-read immediately before the append so a booking committed by
        // another instance since the conflict check is not dropped
        let mut bookings = storage::load_bookings(env.durable.as_ref());
        bookings.push(booking.clone());
        if let Err(error) = storage::save_bookings(env.durable.as_ref(), &bookings) {
            tracing::warn!(%error, "Failed to persist booking list");
        }

        let mut durable_holds = storage::load_holds(env.durable.as_ref());
        for seat_id in &booking.seats {
            durable_holds.remove(seat_id);
            state.holds.remove(seat_id);
        }
        Self::persist_holds(env, &durable_holds);

        state.booked.extend(booking.seats.iter().copied());
        state.selected.clear();

        let listed = join_seats(&booking.seats);
        tracing::info!(seats = %listed, user_id = %booking.user_id, "Booking committed");
        smallvec![
            Self::publish(
                env,
                &WidgetEvent::TicketBooked(TicketBookedPayload {
                    user_id: booking.user_id.clone(),
                    seats: booking.seats.clone(),
                    timestamp: booking.timestamp,
                }),
            ),
            Self::notify(
                env,
                Notification::success(format!("Booking successful for seats: {listed}")),
            ),
        ]
    }

    /// Remove every hold past expiry, publishing one release per hold.
    ///
    /// Idempotent: a second sweep with no new expiries publishes nothing.
    fn sweep(
        state: &mut SeatMapState,
        env: &EngineEnvironment,
    ) -> SmallVec<[Effect<EngineAction>; 4]> {
        let now = env.clock.now();
        let expired: Vec<(SeatId, UserId)> = state
            .holds
            .iter()
            .filter(|(_, hold)| hold.is_expired(now))
            .map(|(seat_id, hold)| (*seat_id, hold.user_id.clone()))
            .collect();

        if expired.is_empty() {
            return SmallVec::new();
        }

        for (seat_id, user_id) in &expired {
            state.holds.remove(seat_id);
            if state.is_current_user(user_id) {
                state.selected.remove(seat_id);
            }
        }
        Self::persist_holds(env, &state.holds);

        tracing::debug!(count = expired.len(), "Swept expired holds");
        expired
            .into_iter()
            .map(|(seat_id, user_id)| {
                Self::publish(
                    env,
                    &WidgetEvent::SeatReleased(SeatReleasedPayload { seat_id, user_id }),
                )
            })
            .collect()
    }
}

impl Reducer for SeatEngineReducer {
    type State = SeatMapState;
    type Action = EngineAction;
    type Environment = EngineEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            EngineAction::SelectSeat { seat_id } => Self::select(state, env, seat_id),

            EngineAction::ReleaseSeat { seat_id, user_id } => {
                Self::release(state, env, seat_id, user_id)
            },

            EngineAction::CommitBooking => Self::commit(state, env),

            EngineAction::SweepExpired => Self::sweep(state, env),

            // ========== Consumed bus events ==========
            EngineAction::UserLoggedIn { user } => {
                tracing::debug!(user_id = %user.user_id, "User logged in");
                state.user = Some(user);
                SmallVec::new()
            },

            EngineAction::UserLoggedOut => {
                state.user = None;
                state.selected.clear();
                SmallVec::new()
            },

            EngineAction::HoldObserved {
                seat_id,
                user_id,
                expires_at,
            } => {
                // A booked seat can never be held again; a stale selecting
                // event racing a booking must not resurrect the hold
                if state.booked.contains(&seat_id) {
                    return SmallVec::new();
                }
                state.holds.insert(
                    seat_id,
                    SeatHold {
                        user_id,
                        expires_at,
                    },
                );
                Self::persist_holds(env, &state.holds);
                SmallVec::new()
            },

            EngineAction::ReleaseObserved { seat_id, .. } => {
                if state.holds.remove(&seat_id).is_some() {
                    Self::persist_holds(env, &state.holds);
                }
                SmallVec::new()
            },

            EngineAction::BookingObserved { seats, .. } => {
                let mut holds_changed = false;
                for seat_id in seats {
                    state.booked.insert(seat_id);
                    if state.holds.remove(&seat_id).is_some() {
                        holds_changed = true;
                    }
                }
                if holds_changed {
                    Self::persist_holds(env, &state.holds);
                }
                SmallVec::new()
            },

            EngineAction::ConflictObserved { seat_id } => {
                smallvec![Self::notify(
                    env,
                    Notification::warning(format!(
                        "Seat {seat_id} is already reserved by another user"
                    )),
                )]
            },
        }
    }
}

fn join_seats(seats: &[SeatId]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

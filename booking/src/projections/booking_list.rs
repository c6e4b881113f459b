//! Booking list projection.
//!
//! Projects the durable booking list for display, filtered by role: the
//! restricted customer role sees only its own bookings, elevated roles see
//! everything.
//!
//! Updates are incremental on `ticketBooked` (append, no storage re-read)
//! and wholesale on login/logout, since an identity change invalidates the
//! filter and anything accumulated under it.

use super::Projection;
use crate::events::WidgetEvent;
use crate::storage;
use crate::types::{Booking, User};
use seatwise_core::storage::KeyValueStore;
use std::sync::Arc;

/// Read-only projection of committed bookings.
pub struct BookingListProjection {
    durable: Arc<dyn KeyValueStore>,
    bookings: Vec<Booking>,
    current_user: Option<User>,
}

impl BookingListProjection {
    /// Creates the projection, loading the current booking list from the
    /// durable store.
    #[must_use]
    pub fn new(durable: Arc<dyn KeyValueStore>, current_user: Option<User>) -> Self {
        let bookings = storage::load_bookings(durable.as_ref());
        Self {
            durable,
            bookings,
            current_user,
        }
    }

    /// Bookings visible to the current user.
    ///
    /// Customers see their own; elevated roles (and the logged-out view) see
    /// the full list.
    #[must_use]
    pub fn visible_bookings(&self) -> Vec<&Booking> {
        match &self.current_user {
            Some(user) if user.role.is_restricted() => self
                .bookings
                .iter()
                .filter(|booking| booking.user_id == user.user_id)
                .collect(),
            _ => self.bookings.iter().collect(),
        }
    }

    /// Total number of bookings held, before filtering
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    /// Whether any bookings exist at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    fn reload(&mut self) {
        self.bookings = storage::load_bookings(self.durable.as_ref());
    }
}

impl Projection for BookingListProjection {
    fn handle_event(&mut self, event: &WidgetEvent) -> Result<(), String> {
        match event {
            // Incremental: append without re-reading storage
            WidgetEvent::TicketBooked(payload) => {
                self.bookings.push(Booking {
                    user_id: payload.user_id.clone(),
                    seats: payload.seats.clone(),
                    timestamp: payload.timestamp,
                });
                Ok(())
            },

            // Identity change invalidates the filter: reload wholesale
            WidgetEvent::UserLoggedIn(user) => {
                self.current_user = Some(user.clone());
                self.reload();
                Ok(())
            },
            WidgetEvent::UserLoggedOut => {
                self.current_user = None;
                self.reload();
                Ok(())
            },

            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::TicketBookedPayload;
    use crate::types::{Permission, Role, SeatId, UserId};
    use chrono::DateTime;
    use seatwise_runtime::storage::MemoryStore;

    fn user(id: &str, role: Role) -> User {
        User {
            user_id: UserId::new(id),
            role,
            permissions: vec![Permission::book_tickets()],
        }
    }

    fn booking(id: &str, seats: &[u32]) -> Booking {
        Booking {
            user_id: UserId::new(id),
            seats: seats.iter().map(|n| SeatId::new(*n)).collect(),
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        }
    }

    fn seeded_store() -> Arc<dyn KeyValueStore> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage::save_bookings(
            store.as_ref(),
            &[booking("alice", &[1, 2]), booking("bob", &[10])],
        )
        .unwrap();
        store
    }

    #[test]
    fn customer_sees_only_own_bookings() {
        let projection =
            BookingListProjection::new(seeded_store(), Some(user("bob", Role::Customer)));
        let visible = projection.visible_bookings();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].user_id, UserId::new("bob"));
    }

    #[test]
    fn admin_sees_everything() {
        let projection =
            BookingListProjection::new(seeded_store(), Some(user("carol", Role::Admin)));
        assert_eq!(projection.visible_bookings().len(), 2);
    }

    #[test]
    fn ticket_booked_appends_without_reload() {
        let store = seeded_store();
        let mut projection =
            BookingListProjection::new(Arc::clone(&store), Some(user("bob", Role::Customer)));

        // storage is NOT re-read on ticketBooked: wipe it to prove that
        store.remove(storage::BOOKING_STORAGE_KEY).unwrap();

        projection
            .handle_event(&WidgetEvent::TicketBooked(TicketBookedPayload {
                user_id: UserId::new("bob"),
                seats: vec![SeatId::new(11)],
                timestamp: DateTime::from_timestamp_millis(1_700_000_001_000).unwrap(),
            }))
            .unwrap();

        assert_eq!(projection.len(), 3);
        assert_eq!(projection.visible_bookings().len(), 2);
    }

    #[test]
    fn login_reloads_and_switches_filter() {
        let store = seeded_store();
        let mut projection = BookingListProjection::new(Arc::clone(&store), None);
        assert_eq!(projection.visible_bookings().len(), 2);

        // a third booking lands in storage out of band
        storage::save_bookings(
            store.as_ref(),
            &[
                booking("alice", &[1, 2]),
                booking("bob", &[10]),
                booking("alice", &[20]),
            ],
        )
        .unwrap();

        projection
            .handle_event(&WidgetEvent::UserLoggedIn(user("alice", Role::Customer)))
            .unwrap();

        let visible = projection.visible_bookings();
        assert_eq!(projection.len(), 3);
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|b| b.user_id == UserId::new("alice")));
    }

    #[test]
    fn logout_clears_filter() {
        let store = seeded_store();
        let mut projection =
            BookingListProjection::new(store, Some(user("bob", Role::Customer)));
        assert_eq!(projection.visible_bookings().len(), 1);

        projection.handle_event(&WidgetEvent::UserLoggedOut).unwrap();
        assert_eq!(projection.visible_bookings().len(), 2);
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut projection = BookingListProjection::new(seeded_store(), None);
        projection
            .handle_event(&WidgetEvent::SeatConflict(
                crate::events::SeatConflictPayload {
                    seat_id: SeatId::new(5),
                },
            ))
            .unwrap();
        assert_eq!(projection.len(), 2);
    }
}

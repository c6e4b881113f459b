//! Typed persistence over the key-value stores.
//!
//! The durable store mirrors two keys: `bookings` (ordered JSON array of
//! booking records) and `reservedSeats` (JSON object mapping seat id to
//! hold), both rewritten wholesale on every mutation. The session store
//! carries the current `user` record, read-only from here.
//!
//! Loads never fail: unreadable backends and malformed JSON are logged at
//! warn level and degrade to the empty value. The durable mirror is
//! reconstructible from use, so corruption must not surface to the user.

use crate::types::{Booking, SeatHold, SeatId, User};
use seatwise_core::storage::{KeyValueStore, StorageError};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};

/// Durable key holding the ordered booking list
pub const BOOKING_STORAGE_KEY: &str = "bookings";
/// Durable key holding the seat-id → hold map
pub const RESERVED_STORAGE_KEY: &str = "reservedSeats";
/// Session key holding the current user record
pub const SESSION_USER_KEY: &str = "user";

fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(error) => {
            tracing::warn!(key, %error, "Store read failed, treating as empty");
            return T::default();
        },
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(key, %error, "Malformed persisted state, treating as empty");
            T::default()
        },
    }
}

/// Load the durable booking list; malformed or missing data yields an empty
/// list.
#[must_use]
pub fn load_bookings(store: &dyn KeyValueStore) -> Vec<Booking> {
    load_or_default(store, BOOKING_STORAGE_KEY)
}

/// Persist the full booking list.
///
/// # Errors
///
/// Returns [`StorageError`] if the encoded list cannot be written.
pub fn save_bookings(store: &dyn KeyValueStore, bookings: &[Booking]) -> Result<(), StorageError> {
    let rendered =
        serde_json::to_string(bookings).map_err(|e| StorageError::WriteFailed {
            key: BOOKING_STORAGE_KEY.to_string(),
            reason: e.to_string(),
        })?;
    store.set(BOOKING_STORAGE_KEY, &rendered)
}

/// Load the durable hold map; malformed or missing data yields an empty map.
#[must_use]
pub fn load_holds(store: &dyn KeyValueStore) -> BTreeMap<SeatId, SeatHold> {
    load_or_default(store, RESERVED_STORAGE_KEY)
}

/// Persist the full hold map.
///
/// # Errors
///
/// Returns [`StorageError`] if the encoded map cannot be written.
pub fn save_holds(
    store: &dyn KeyValueStore,
    holds: &BTreeMap<SeatId, SeatHold>,
) -> Result<(), StorageError> {
    let rendered = serde_json::to_string(holds).map_err(|e| StorageError::WriteFailed {
        key: RESERVED_STORAGE_KEY.to_string(),
        reason: e.to_string(),
    })?;
    store.set(RESERVED_STORAGE_KEY, &rendered)
}

/// Read the current user from the session store, if one is logged in.
///
/// Malformed identity records are logged and treated as logged out.
#[must_use]
pub fn load_session_user(store: &dyn KeyValueStore) -> Option<User> {
    let raw = match store.get(SESSION_USER_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(key = SESSION_USER_KEY, %error, "Session read failed");
            return None;
        },
    };

    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(error) => {
            tracing::warn!(key = SESSION_USER_KEY, %error, "Malformed session user");
            None
        },
    }
}

/// Every seat appearing in any booking record.
#[must_use]
pub fn booked_seats(bookings: &[Booking]) -> BTreeSet<SeatId> {
    bookings
        .iter()
        .flat_map(|booking| booking.seats.iter().copied())
        .collect()
}

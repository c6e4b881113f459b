//! Domain types for the seat-booking widget.
//!
//! This module contains the value objects shared by the reservation engine,
//! the booking-list projection, and the wire payloads. Serde attribute names
//! follow the external contract: camelCase field names, epoch-millisecond
//! timestamps, lowercase role strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a user, as issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a `UserId` from its string form
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The fallback identity recorded when a booking is committed without a
    /// usable user id
    #[must_use]
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    /// String form of the id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is the empty string
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User role, controlling booking-list visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Restricted role: sees only their own bookings
    Customer,
    /// Elevated role: sees every booking
    Admin,
}

impl Role {
    /// Whether this role only sees its own bookings
    #[must_use]
    pub const fn is_restricted(self) -> bool {
        matches!(self, Self::Customer)
    }
}

/// A named permission held by a user.
///
/// Permission names are opaque strings on the wire; the two this widget
/// cares about have constructors.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Creates a permission from its wire name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Permission required to select and book seats
    #[must_use]
    pub fn book_tickets() -> Self {
        Self("book_tickets".to_string())
    }

    /// Permission granting elevated booking-list visibility
    #[must_use]
    pub fn view_all_bookings() -> Self {
        Self("view_all_bookings".to_string())
    }

    /// Wire name of the permission
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The logged-in user as supplied by session identity.
///
/// Not owned by this core: it arrives over the bus or from the session store
/// and is only ever read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier
    pub user_id: UserId,
    /// Role for visibility filtering
    pub role: Role,
    /// Granted permissions; absent on the wire means none
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl User {
    /// Whether the user holds the given permission
    #[must_use]
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}

/// Seat identifier: an integer in `[1, TOTAL_SEATS]`.
///
/// The range bound is configuration, so the newtype itself is unchecked;
/// the engine rejects out-of-range ids as silent no-ops.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SeatId(u32);

impl SeatId {
    /// Creates a seat id from its number
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// The seat number
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this id falls inside a grid of `total_seats` seats
    #[must_use]
    pub const fn in_range(self, total_seats: u32) -> bool {
        self.0 >= 1 && self.0 <= total_seats
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A temporary hold on one seat, pending booking commitment.
///
/// Keyed by [`SeatId`] in the hold map; exists only between selection and
/// release/expiry/booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatHold {
    /// The user holding the seat
    pub user_id: UserId,
    /// When the hold lapses: always creation time plus the reservation timeout
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl SeatHold {
    /// Whether the hold has lapsed at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A committed booking. Immutable once created; the durable booking list
/// only ever grows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Who booked
    pub user_id: UserId,
    /// The seats now permanently unavailable
    pub seats: Vec<SeatId>,
    /// When the booking was committed
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Derived status of one seat. Computed on each read from the booked set,
/// the hold map, and the caller's identity; never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatStatus {
    /// Available for selection
    Free,
    /// Held by the current user (selected)
    ReservedBySelf,
    /// Held by someone else
    ReservedByOther,
    /// Permanently booked; terminal
    Booked,
}

/// Severity of a user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Operation completed
    Success,
    /// Operation rejected
    Error,
    /// Something to pay attention to
    Warning,
    /// Informational
    Info,
}

/// A user-facing notification published on the `notification` topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Human-readable message
    pub message: String,
    /// Severity
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    /// Creates a success notification
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    /// Creates an error notification
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
        }
    }

    /// Creates a warning notification
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Warning,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_wire_shape_is_camel_case() {
        let raw = r#"{"userId":"u1","role":"customer","permissions":["book_tickets"]}"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.user_id.as_str(), "u1");
        assert!(user.role.is_restricted());
        assert!(user.has_permission(&Permission::book_tickets()));
        assert!(!user.has_permission(&Permission::view_all_bookings()));
    }

    #[test]
    fn user_permissions_default_to_empty() {
        let raw = r#"{"userId":"u1","role":"admin"}"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert!(user.permissions.is_empty());
        assert!(!user.role.is_restricted());
    }

    #[test]
    fn hold_serializes_with_millisecond_expiry() {
        let hold = SeatHold {
            user_id: UserId::new("u1"),
            expires_at: DateTime::from_timestamp_millis(1_700_000_030_000).unwrap(),
        };
        let rendered = serde_json::to_string(&hold).unwrap();
        assert_eq!(
            rendered,
            r#"{"userId":"u1","expiresAt":1700000030000}"#
        );
    }

    #[test]
    fn hold_expiry_is_strict() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let hold = SeatHold {
            user_id: UserId::new("u1"),
            expires_at: at,
        };
        assert!(!hold.is_expired(at));
        assert!(hold.is_expired(at + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn seat_id_range_check() {
        assert!(SeatId::new(1).in_range(50));
        assert!(SeatId::new(50).in_range(50));
        assert!(!SeatId::new(0).in_range(50));
        assert!(!SeatId::new(51).in_range(50));
    }

    #[test]
    fn notification_wire_uses_type_field() {
        let n = Notification::warning("Seat 5 is already reserved by another user");
        let rendered = serde_json::to_string(&n).unwrap();
        assert!(rendered.contains(r#""type":"warning""#));
    }
}

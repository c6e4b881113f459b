//! Typed bus events and their wire encoding.
//!
//! Every topic the widget produces or consumes has a variant in
//! [`WidgetEvent`]; the topic strings are the external contract and are
//! preserved verbatim. Payloads encode as the camelCase JSON bodies other
//! widget builds expect.

use crate::types::{Notification, SeatId, User, UserId};
use chrono::{DateTime, Utc};
use seatwise_core::event::{EventError, SerializedEvent};
use serde::{Deserialize, Serialize};

/// Topic names consumed and produced by the widget.
pub mod topics {
    /// Session identity arrived
    pub const USER_LOGGED_IN: &str = "userLoggedIn";
    /// Session identity cleared
    pub const USER_LOGGED_OUT: &str = "userLoggedOut";
    /// A seat was selected and is now held
    pub const SEAT_SELECTING: &str = "seatSelecting";
    /// A hold was released (manually, by timer, or by sweep)
    pub const SEAT_RELEASED: &str = "seatReleased";
    /// A selection was blocked by another user's hold
    pub const SEAT_CONFLICT: &str = "seatConflict";
    /// A booking was committed
    pub const TICKET_BOOKED: &str = "ticketBooked";
    /// User-facing notification
    pub const NOTIFICATION: &str = "notification";
}

/// Payload of [`topics::SEAT_SELECTING`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSelectingPayload {
    /// The seat now held
    pub seat_id: SeatId,
    /// Who holds it
    pub user_id: UserId,
    /// When the hold was created
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// When the hold lapses
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

/// Payload of [`topics::SEAT_RELEASED`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatReleasedPayload {
    /// The seat no longer held
    pub seat_id: SeatId,
    /// Who held it
    pub user_id: UserId,
}

/// Payload of [`topics::SEAT_CONFLICT`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatConflictPayload {
    /// The contested seat
    pub seat_id: SeatId,
}

/// Payload of [`topics::TICKET_BOOKED`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketBookedPayload {
    /// Who booked
    pub user_id: UserId,
    /// The seats now permanently booked
    pub seats: Vec<SeatId>,
    /// When the booking was committed
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// A bus event, one variant per topic.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetEvent {
    /// `userLoggedIn`
    UserLoggedIn(User),
    /// `userLoggedOut` (no payload)
    UserLoggedOut,
    /// `seatSelecting`
    SeatSelecting(SeatSelectingPayload),
    /// `seatReleased`
    SeatReleased(SeatReleasedPayload),
    /// `seatConflict`
    SeatConflict(SeatConflictPayload),
    /// `ticketBooked`
    TicketBooked(TicketBookedPayload),
    /// `notification`
    Notification(Notification),
}

impl WidgetEvent {
    /// The topic this event travels on
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::UserLoggedIn(_) => topics::USER_LOGGED_IN,
            Self::UserLoggedOut => topics::USER_LOGGED_OUT,
            Self::SeatSelecting(_) => topics::SEAT_SELECTING,
            Self::SeatReleased(_) => topics::SEAT_RELEASED,
            Self::SeatConflict(_) => topics::SEAT_CONFLICT,
            Self::TicketBooked(_) => topics::TICKET_BOOKED,
            Self::Notification(_) => topics::NOTIFICATION,
        }
    }

    /// Encode into a bus envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Serialization`] if the payload cannot be encoded.
    pub fn to_serialized(&self) -> Result<SerializedEvent, EventError> {
        match self {
            Self::UserLoggedIn(user) => SerializedEvent::from_json(self.topic(), user),
            Self::UserLoggedOut => SerializedEvent::from_json(self.topic(), &()),
            Self::SeatSelecting(payload) => SerializedEvent::from_json(self.topic(), payload),
            Self::SeatReleased(payload) => SerializedEvent::from_json(self.topic(), payload),
            Self::SeatConflict(payload) => SerializedEvent::from_json(self.topic(), payload),
            Self::TicketBooked(payload) => SerializedEvent::from_json(self.topic(), payload),
            Self::Notification(notification) => {
                SerializedEvent::from_json(self.topic(), notification)
            },
        }
    }

    /// Decode a bus envelope back into a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEventType`] for topics outside the
    /// contract and [`EventError::Deserialization`] for malformed payloads.
    pub fn from_serialized(event: &SerializedEvent) -> Result<Self, EventError> {
        match event.event_type.as_str() {
            topics::USER_LOGGED_IN => Ok(Self::UserLoggedIn(event.decode_json()?)),
            topics::USER_LOGGED_OUT => Ok(Self::UserLoggedOut),
            topics::SEAT_SELECTING => Ok(Self::SeatSelecting(event.decode_json()?)),
            topics::SEAT_RELEASED => Ok(Self::SeatReleased(event.decode_json()?)),
            topics::SEAT_CONFLICT => Ok(Self::SeatConflict(event.decode_json()?)),
            topics::TICKET_BOOKED => Ok(Self::TicketBooked(event.decode_json()?)),
            topics::NOTIFICATION => Ok(Self::Notification(event.decode_json()?)),
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Permission, Role};

    fn millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn seat_selecting_wire_shape() {
        let event = WidgetEvent::SeatSelecting(SeatSelectingPayload {
            seat_id: SeatId::new(4),
            user_id: UserId::new("alice"),
            timestamp: millis(1_700_000_000_000),
            expires_at: millis(1_700_000_030_000),
        });

        let serialized = event.to_serialized().unwrap();
        assert_eq!(serialized.event_type, "seatSelecting");

        let body: serde_json::Value = serde_json::from_slice(&serialized.payload).unwrap();
        assert_eq!(body["seatId"], 4);
        assert_eq!(body["userId"], "alice");
        assert_eq!(body["expiresAt"], 1_700_000_030_000_i64);
    }

    #[test]
    fn round_trip_all_variants() {
        let user = User {
            user_id: UserId::new("bob"),
            role: Role::Customer,
            permissions: vec![Permission::book_tickets()],
        };
        let events = vec![
            WidgetEvent::UserLoggedIn(user),
            WidgetEvent::UserLoggedOut,
            WidgetEvent::SeatReleased(SeatReleasedPayload {
                seat_id: SeatId::new(7),
                user_id: UserId::new("bob"),
            }),
            WidgetEvent::SeatConflict(SeatConflictPayload {
                seat_id: SeatId::new(5),
            }),
            WidgetEvent::TicketBooked(TicketBookedPayload {
                user_id: UserId::new("bob"),
                seats: vec![SeatId::new(4), SeatId::new(6)],
                timestamp: millis(1_700_000_000_000),
            }),
            WidgetEvent::Notification(Notification::success("Booking successful for seats: 4, 6")),
            WidgetEvent::Notification(Notification {
                message: "Holds expire after 30 seconds".to_string(),
                kind: crate::types::NotificationKind::Info,
            }),
        ];

        for event in events {
            let serialized = event.to_serialized().unwrap();
            assert_eq!(serialized.event_type, event.topic());
            let decoded = WidgetEvent::from_serialized(&serialized).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn unknown_topic_is_rejected() {
        let envelope = SerializedEvent::new("bookingFailed".to_string(), b"{}".to_vec(), None);
        assert!(matches!(
            WidgetEvent::from_serialized(&envelope),
            Err(EventError::UnknownEventType(topic)) if topic == "bookingFailed"
        ));
    }
}

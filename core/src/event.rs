//! Serialized event envelope shared by the bus and its subscribers.
//!
//! Events cross the bus as a [`SerializedEvent`]: a type tag (the topic
//! name), a JSON payload, and optional metadata. JSON is the single wire
//! format here because the durable store contract is JSON and two widget
//! builds must be able to interoperate over the same bus and storage.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Error types for event encoding and decoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event payload.
    #[error("Failed to serialize event: {0}")]
    Serialization(String),

    /// Failed to deserialize an event payload.
    #[error("Failed to deserialize event: {0}")]
    Deserialization(String),

    /// Unknown event type encountered during decoding.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// A serialized event as carried on the bus.
///
/// The `event_type` doubles as the topic name (`seatSelecting`,
/// `ticketBooked`, ...); the payload is the topic's JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedEvent {
    /// Event type tag, identical to the topic the event travels on
    pub event_type: String,
    /// JSON-encoded payload
    pub payload: Vec<u8>,
    /// Optional metadata (correlation ids, origin instance, ...)
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Creates a new `SerializedEvent` from pre-encoded payload bytes
    #[must_use]
    pub const fn new(
        event_type: String,
        payload: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            payload,
            metadata,
        }
    }

    /// Encode a payload value as JSON into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Serialization`] if the payload cannot be
    /// encoded as JSON.
    pub fn from_json<T: Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, EventError> {
        let bytes =
            serde_json::to_vec(payload).map_err(|e| EventError::Serialization(e.to_string()))?;
        Ok(Self::new(event_type.into(), bytes, None))
    }

    /// Decode the JSON payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Deserialization`] if the payload is not valid
    /// JSON for `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, EventError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| EventError::Deserialization(e.to_string()))
    }
}

//! # Booking
//!
//! Seat-booking widget: a client-side seat-reservation protocol with
//! temporary holds and expiry, conflict detection between concurrent
//! selectors, and booking commit.
//!
//! Two components cooperate through a process-wide event bus and two
//! key-value stores:
//!
//! - the [`engine`] reduces selection/release/commit/sweep actions over
//!   seat-map state and mirrors holds and bookings into the durable store;
//! - the [`projections`] module projects the committed booking list,
//!   filtered by role.
//!
//! [`widget::BookingWidget`] wires one instance of both onto a bus and
//! manages its lifecycle. Multiple instances sharing a durable store model
//! concurrent selectors; the commit-time re-validation against freshly
//! loaded durable state is the only check that is trusted.

pub mod config;
pub mod engine;
pub mod events;
pub mod projections;
pub mod storage;
pub mod types;
pub mod widget;

pub use config::Config;
pub use widget::{BookingWidget, WidgetError};

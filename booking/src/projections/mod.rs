//! Read model projections for the booking widget.
//!
//! Projections consume bus events and maintain denormalized views optimized
//! for display. They are read-only with respect to the domain: nothing a
//! projection does feeds back into the reservation engine.

pub mod booking_list;

pub use booking_list::BookingListProjection;

use crate::events::WidgetEvent;

/// Trait for read-model projections fed from the bus.
pub trait Projection {
    /// Apply one event to the read model.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure; callers log it and continue,
    /// a projection error never stops event flow.
    fn handle_event(&mut self, event: &WidgetEvent) -> Result<(), String>;
}

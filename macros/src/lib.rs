//! Derive macros for the Seatwise widget framework
//!
//! This crate provides procedural macros to reduce boilerplate when building
//! reducer-driven components.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates helpers for action enums (commands/events)
//!
//! # Example
//!
//! ```ignore
//! use seatwise_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum EngineAction {
//!     #[command]
//!     SelectSeat { seat_id: SeatId },
//!
//!     #[event]
//!     HoldObserved { seat_id: SeatId, user_id: UserId },
//! }
//!
//! // Generated methods:
//! assert!(EngineAction::SelectSeat { seat_id }.is_command());
//! assert!(EngineAction::HoldObserved { seat_id, user_id }.is_event());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant is a command
/// - `is_event()` - Returns true if this variant is a consumed/observed event
/// - `kind()` - Returns `"command"`, `"event"`, or `"unknown"` for logging
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[event]` - Mark a variant as an event
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]` attributes
#[proc_macro_derive(Action, attributes(command, event))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut command_variants = Vec::new();
    let mut event_variants = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        if is_command && is_event {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[event]",
            )
            .to_compile_error()
            .into();
        }

        if is_command {
            command_variants.push((variant_name, &variant.fields));
        }

        if is_event {
            event_variants.push((variant_name, &variant.fields));
        }
    }

    let is_command_arms = command_variants.iter().map(|(variant, fields)| match fields {
        Fields::Named(_) => quote! { Self::#variant { .. } => true, },
        Fields::Unnamed(_) => quote! { Self::#variant(..) => true, },
        Fields::Unit => quote! { Self::#variant => true, },
    });

    let is_event_arms = event_variants.iter().map(|(variant, fields)| match fields {
        Fields::Named(_) => quote! { Self::#variant { .. } => true, },
        Fields::Unnamed(_) => quote! { Self::#variant(..) => true, },
        Fields::Unit => quote! { Self::#variant => true, },
    });

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is a consumed/observed event
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns the action kind as a static string, for structured logging
            #[must_use]
            pub const fn kind(&self) -> &'static str {
                if self.is_command() {
                    "command"
                } else if self.is_event() {
                    "event"
                } else {
                    "unknown"
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

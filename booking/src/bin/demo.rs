//! Scripted walkthrough of the booking widget.
//!
//! Runs two widget instances against a shared durable store, the way two
//! browser contexts share one profile: alice (admin) books seats and leaves
//! a hold behind, then bob (customer) collides with it. Notifications are
//! printed as they cross each instance's bus.
//!
//! ```bash
//! RUST_LOG=info cargo run -p booking --bin demo
//! ```

use anyhow::Result;
use booking::config::Config;
use booking::events::{WidgetEvent, topics};
use booking::types::{Notification, Permission, Role, SeatId, User, UserId};
use booking::widget::BookingWidget;
use seatwise_core::environment::SystemClock;
use seatwise_core::event_bus::{EventBus, SubscriptionHandle};
use seatwise_core::storage::KeyValueStore;
use seatwise_runtime::bus::ProcessEventBus;
use seatwise_runtime::storage::{JsonFileStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn print_notifications(bus: &Arc<dyn EventBus>, context: &'static str) -> Result<SubscriptionHandle> {
    let handle = bus.subscribe(
        topics::NOTIFICATION,
        Box::new(move |event| {
            if let Ok(WidgetEvent::Notification(Notification { message, kind })) =
                WidgetEvent::from_serialized(event)
            {
                println!("[{context}] {kind:?}: {message}");
            }
        }),
    )?;
    Ok(handle)
}

async fn drain() {
    // let publish effects and the bus pump run; armed hold-expiry delays
    // stay pending, so this cannot wait for a fully drained effect queue
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let clock = Arc::new(SystemClock);

    // One durable store shared by both contexts, like a browser profile
    let durable_path = std::env::temp_dir().join("seatwise-demo.json");
    let _ = std::fs::remove_file(&durable_path);
    let durable: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&durable_path));

    // ---- context A: alice, already logged in via her session store ----
    let alice = User {
        user_id: UserId::new("alice"),
        role: Role::Admin,
        permissions: vec![Permission::book_tickets(), Permission::view_all_bookings()],
    };
    let alice_session = Arc::new(MemoryStore::new());
    alice_session.set("user", &serde_json::to_string(&alice)?)?;

    let alice_bus: Arc<dyn EventBus> = Arc::new(ProcessEventBus::new());
    let _alice_printer = print_notifications(&alice_bus, "alice")?;
    let alice_widget = BookingWidget::mount(
        &config,
        Arc::clone(&alice_bus),
        Arc::clone(&durable),
        alice_session,
        clock.clone(),
    )?;

    println!("alice selects seats 4 and 6, then books them");
    alice_widget.select_seat(SeatId::new(4)).await?;
    alice_widget.select_seat(SeatId::new(6)).await?;
    alice_widget.commit_booking().await?;
    drain().await;

    println!("alice holds seat 7 without committing");
    alice_widget.select_seat(SeatId::new(7)).await?;
    drain().await;

    // ---- context B: bob, logging in over the bus ----
    let bob_bus: Arc<dyn EventBus> = Arc::new(ProcessEventBus::new());
    let _bob_printer = print_notifications(&bob_bus, "bob")?;
    let bob_widget = BookingWidget::mount(
        &config,
        Arc::clone(&bob_bus),
        Arc::clone(&durable),
        Arc::new(MemoryStore::new()),
        clock,
    )?;

    let bob = User {
        user_id: UserId::new("bob"),
        role: Role::Customer,
        permissions: vec![Permission::book_tickets()],
    };
    bob_bus.publish(
        topics::USER_LOGGED_IN,
        &WidgetEvent::UserLoggedIn(bob).to_serialized()?,
    )?;
    drain().await;

    bob_widget.select_seat(SeatId::new(4)).await?;
    drain().await;
    println!(
        "bob tries seat 4 (already booked): {:?}",
        bob_widget.seat_status(SeatId::new(4)).await
    );

    println!("bob tries seat 7 (held by alice)");
    bob_widget.select_seat(SeatId::new(7)).await?;
    drain().await;

    println!("bob books seat 8 instead");
    bob_widget.select_seat(SeatId::new(8)).await?;
    bob_widget.commit_booking().await?;
    drain().await;

    println!("\nalice (admin) sees {} bookings", alice_widget.visible_bookings().len());
    for booking in alice_widget.visible_bookings() {
        println!(
            "  {} -> seats {:?}",
            booking.user_id,
            booking.seats.iter().map(|seat| seat.get()).collect::<Vec<_>>()
        );
    }
    println!("bob (customer) sees {} booking(s)", bob_widget.visible_bookings().len());

    // Hold-expiry timers for the committed seats are still armed; shutdown
    // reports them and the tasks die with the runtime.
    for (name, widget) in [("alice", alice_widget), ("bob", bob_widget)] {
        if let Err(error) = widget.teardown(Duration::from_millis(100)).await {
            tracing::debug!(context = name, %error, "Teardown left effects pending");
        }
    }

    Ok(())
}

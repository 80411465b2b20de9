//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, geo, errors, events)
//! - `trip` - Read-only trip snapshot owned by the booking subsystem
//! - `driver` - Live driver records and per-connection subscriptions
//! - `dispatch` - Offer policy, offers, and the per-trip offer cycle

pub mod dispatch;
pub mod driver;
pub mod foundation;
pub mod trip;

//! Trip dispatch HTTP endpoints.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{accept_offer, cancel_trip, decline_offer, dispatch_trip};
pub use routes::trip_routes;

//! Axum routes for trip dispatch endpoints.

use axum::{routing::post, Router};

use crate::adapters::http::AppState;

use super::handlers::{accept_offer, cancel_trip, decline_offer, dispatch_trip};

/// # Routes
///
/// ## Booking side
/// - `POST /:trip_id/dispatch` - Start an offer cycle
/// - `POST /:trip_id/cancel` - Withdraw the trip
///
/// ## Driver side
/// - `POST /:trip_id/offers/:sequence/accept`
/// - `POST /:trip_id/offers/:sequence/decline`
pub fn trip_routes() -> Router<AppState> {
    Router::new()
        .route("/:trip_id/dispatch", post(dispatch_trip))
        .route("/:trip_id/cancel", post(cancel_trip))
        .route("/:trip_id/offers/:sequence/accept", post(accept_offer))
        .route("/:trip_id/offers/:sequence/decline", post(decline_offer))
}

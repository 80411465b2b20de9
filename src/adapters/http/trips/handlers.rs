//! HTTP handlers for trip dispatch endpoints.
//!
//! Dispatch and cancel are called by the booking subsystem (or an organizer
//! session). Accept and decline are the REST fallback for driver clients;
//! the driver always comes from the session, never from the request.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::AppState;
use crate::domain::dispatch::{DispatchError, DispatchSequence};
use crate::domain::foundation::{AuthError, AuthenticatedUser, DriverId, TripId};

use super::dto::{AcceptResponse, CancelResponse, DeclineResponse, DispatchResponse};

/// Only non-driver sessions manage trips, and a tenant-scoped session only
/// those in its own tenant.
async fn authorize_trip(
    state: &AppState,
    user: &AuthenticatedUser,
    trip_id: &TripId,
) -> Result<(), ApiError> {
    if state.service.is_driver_session(user).await {
        tracing::warn!(%trip_id, user_id = %user.id, "driver session tried to manage a trip");
        return Err(ApiError::forbidden("Driver sessions cannot dispatch or cancel trips"));
    }
    let trip = state
        .service
        .find_trip(trip_id)
        .await?
        .ok_or(DispatchError::TripNotFound(*trip_id))?;
    if user.may_access_tenant(&trip.tenant_id) {
        Ok(())
    } else {
        tracing::warn!(%trip_id, user_id = %user.id, "cross-tenant trip access denied");
        Err(ApiError::forbidden("Trip belongs to another tenant"))
    }
}

async fn session_driver(state: &AppState, user: &AuthenticatedUser) -> Result<DriverId, ApiError> {
    state.service.resolve_driver(user).await.map_err(|err| match err {
        AuthError::NotADriver => ApiError::forbidden("No driver profile for this session"),
        other => ApiError::new(StatusCode::UNAUTHORIZED, "AUTH_ERROR", other.to_string()),
    })
}

/// POST /api/trips/:trip_id/dispatch
pub async fn dispatch_trip(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(trip_id): Path<TripId>,
) -> Result<impl IntoResponse, ApiError> {
    authorize_trip(&state, &user, &trip_id).await?;
    let receipt = state.service.dispatch_trip(trip_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DispatchResponse::from(receipt))))
}

/// POST /api/trips/:trip_id/cancel
pub async fn cancel_trip(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(trip_id): Path<TripId>,
) -> Result<impl IntoResponse, ApiError> {
    authorize_trip(&state, &user, &trip_id).await?;
    let closed_cycle = state.service.cancel_trip(trip_id).await?;
    Ok(Json(CancelResponse {
        trip_id,
        closed_cycle,
    }))
}

/// POST /api/trips/:trip_id/offers/:sequence/accept
pub async fn accept_offer(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((trip_id, sequence)): Path<(TripId, u64)>,
) -> Result<impl IntoResponse, ApiError> {
    let driver_id = session_driver(&state, &user).await?;
    let receipt = state
        .service
        .accept_offer(driver_id, trip_id, DispatchSequence::new(sequence))
        .await?;
    Ok(Json(AcceptResponse::from(receipt)))
}

/// POST /api/trips/:trip_id/offers/:sequence/decline
pub async fn decline_offer(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((trip_id, sequence)): Path<(TripId, u64)>,
) -> Result<impl IntoResponse, ApiError> {
    let driver_id = session_driver(&state, &user).await?;
    let sequence = DispatchSequence::new(sequence);
    let outcome = state
        .service
        .decline_offer(driver_id, trip_id, sequence)
        .await?;
    Ok(Json(DeclineResponse {
        trip_id,
        sequence,
        outcome,
    }))
}

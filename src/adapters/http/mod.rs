//! HTTP adapters - REST API and router assembly.
//!
//! ```text
//! /health                                  liveness + engine gauges
//! /api/trips/:trip_id/dispatch             booking subsystem → start offer cycle
//! /api/trips/:trip_id/cancel               booking subsystem → close open cycle
//! /api/trips/:trip_id/offers/:seq/accept   driver REST fallback
//! /api/trips/:trip_id/offers/:seq/decline  driver REST fallback
//! /ws/driver, /ws/trips/:trip_id           see `adapters::websocket`
//! ```

pub mod error;
pub mod middleware;
pub mod trips;

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use http::HeaderName;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{
    websocket_router, DriverConnections, PassengerRooms, WebSocketState,
};
use crate::application::DispatchService;
use crate::config::ServerConfig;
use crate::ports::SessionValidator;

pub use error::{ApiError, ErrorResponse};
pub use middleware::{auth_middleware, AuthState, RequireAuth};
pub use trips::trip_routes;

use trips::dto::HealthResponse;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Shared state for every HTTP and WebSocket route.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DispatchService>,
    pub validator: Arc<dyn SessionValidator>,
    pub connections: Arc<DriverConnections>,
    pub rooms: Arc<PassengerRooms>,
}

impl AppState {
    pub fn websocket_state(&self) -> WebSocketState {
        WebSocketState {
            service: self.service.clone(),
            validator: self.validator.clone(),
            connections: self.connections.clone(),
            rooms: self.rooms.clone(),
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.validator.clone()
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_cycles: state.service.arbiter().tracked_trips().await,
        connected_drivers: state.connections.connected_count().await,
    })
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() && !server.is_production() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// Builds the full application router.
pub fn app_router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .nest(
            "/api/trips",
            trip_routes().layer(axum::middleware::from_fn_with_state(
                state.auth_state(),
                auth_middleware,
            )),
        )
        .route("/health", get(health))
        .with_state(state.clone());

    let ws = websocket_router().with_state(state.websocket_state());

    Router::new()
        .merge(api)
        .merge(ws)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{
        InMemoryNotificationSink, InMemoryOfferAuditLog, InMemoryTripRepository,
    };
    use crate::application::{
        AcceptanceArbiter, ArbiterPorts, ArbiterSettings, GeoIndex, OfferBroadcaster,
        SequenceAllocator, SubscriptionRegistry,
    };
    use crate::config::Environment;
    use crate::domain::dispatch::OfferPolicy;
    use crate::domain::foundation::{
        AuthenticatedUser, DriverId, GeoPoint, TenantId, Timestamp, TripId, UserId,
    };
    use crate::domain::trip::{Place, Trip, TripStatus, TripType};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        state_with_trips().0
    }

    fn state_with_trips() -> (AppState, Arc<InMemoryTripRepository>) {
        let trips = Arc::new(InMemoryTripRepository::new());
        let geo = Arc::new(GeoIndex::default());
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let connections = Arc::new(DriverConnections::default());
        let events = Arc::new(InMemoryEventBus::new());
        let arbiter = AcceptanceArbiter::new(
            ArbiterPorts {
                trips: trips.clone(),
                channel: connections.clone(),
                notifications: Arc::new(InMemoryNotificationSink::new()),
                events: events.clone(),
            },
            geo.clone(),
            ArbiterSettings::default(),
        );
        let broadcaster = OfferBroadcaster::new(
            OfferPolicy::default(),
            geo.clone(),
            subscriptions.clone(),
            Arc::new(SequenceAllocator::default()),
            arbiter.clone(),
            connections.clone(),
            Arc::new(InMemoryOfferAuditLog::new()),
            events,
        );
        let service = Arc::new(DispatchService::new(
            trips.clone(),
            geo,
            subscriptions,
            broadcaster,
            arbiter,
        ));
        let validator = MockSessionValidator::new()
            .with_user(
                "organizer",
                AuthenticatedUser::new(UserId::new("organizer-1").unwrap(), None, None),
            )
            .with_user(
                "astana-organizer",
                AuthenticatedUser::new(
                    UserId::new("organizer-2").unwrap(),
                    None,
                    Some(TenantId::new("astana").unwrap()),
                ),
            )
            .with_user(
                "driver",
                AuthenticatedUser::new(UserId::new("driver-1").unwrap(), None, None)
                    .with_driver_id(DriverId::new()),
            );
        let state = AppState {
            service,
            validator: Arc::new(validator),
            connections,
            rooms: Arc::new(PassengerRooms::default()),
        };
        (state, trips)
    }

    fn almaty_trip() -> Trip {
        let point = GeoPoint::new(43.2381, 76.9452).unwrap();
        Trip {
            id: TripId::new(),
            tenant_id: TenantId::new("almaty").unwrap(),
            origin: Place::new("Almaty", point),
            destination: Place::new("Kapchagay", GeoPoint::new(43.88, 77.07).unwrap()),
            departure_time: Timestamp::now().plus_minutes(120),
            seats_total: 4,
            seats_available: 4,
            base_price: 5000,
            platform_fee: 500,
            trip_type: TripType::Shared,
            discovery_radius_km: 25.0,
            status: TripStatus::SeekingDriver,
            driver_id: None,
        }
    }

    fn post(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app_router(state(), &ServerConfig::default());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["active_cycles"], 0);
        assert_eq!(json["connected_drivers"], 0);
    }

    #[tokio::test]
    async fn dispatch_requires_authentication() {
        let app = app_router(state(), &ServerConfig::default());
        let uri = format!("/api/trips/{}/dispatch", TripId::new());

        let response = app.oneshot(post(&uri, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dispatch_unknown_trip_is_404() {
        let app = app_router(state(), &ServerConfig::default());
        let uri = format!("/api/trips/{}/dispatch", TripId::new());

        let response = app.oneshot(post(&uri, Some("organizer"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn driver_session_cannot_dispatch_or_cancel() {
        let (state, trips) = state_with_trips();
        let trip = almaty_trip();
        trips.insert(trip.clone()).await;
        let app = app_router(state, &ServerConfig::default());

        for action in ["dispatch", "cancel"] {
            let uri = format!("/api/trips/{}/{}", trip.id, action);
            let response = app.clone().oneshot(post(&uri, Some("driver"))).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", action);
        }
        assert_eq!(trips.get(&trip.id).await.unwrap().status, TripStatus::SeekingDriver);
    }

    #[tokio::test]
    async fn other_tenant_cannot_cancel() {
        let (state, trips) = state_with_trips();
        let trip = almaty_trip();
        trips.insert(trip.clone()).await;
        let app = app_router(state, &ServerConfig::default());
        let uri = format!("/api/trips/{}/cancel", trip.id);

        let response = app
            .oneshot(post(&uri, Some("astana-organizer")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn accept_without_driver_profile_is_forbidden() {
        let app = app_router(state(), &ServerConfig::default());
        let uri = format!("/api/trips/{}/offers/1/accept", TripId::new());

        let response = app.oneshot(post(&uri, Some("organizer"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn production_cors_ignores_invalid_origins() {
        let server = ServerConfig {
            environment: Environment::Production,
            cors_origins: Some("https://ops.example.com, bad\norigin".to_string()),
            ..Default::default()
        };
        // Builds without panicking; the invalid entry is dropped.
        let _ = cors_layer(&server);
    }
}

//! WebSocket upgrade handlers for drivers and passengers.
//!
//! Connection lifecycle:
//! 1. Validate the `token` query parameter before upgrading
//! 2. Upgrade to WebSocket
//! 3. Register the driver queue, or join the trip's passenger room
//! 4. Pump messages until either side hangs up
//! 5. Clean up registration and room membership

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::application::DispatchService;
use crate::domain::driver::DriverSubscription;
use crate::domain::foundation::{
    AuthError, AuthenticatedUser, DriverId, GeoPoint, Timestamp, TripId,
};
use crate::ports::SessionValidator;

use super::driver_connections::DriverConnections;
use super::messages::{
    AcceptedMessage, ConnectedMessage, DeclinedMessage, DriverClientMessage, ErrorMessage,
    PassengerClientMessage, PongMessage, ServerMessage,
};
use super::passenger_rooms::{ClientId, PassengerRooms};

/// Depth of the per-socket queue for direct replies (pong, accept results).
const REPLY_QUEUE_CAPACITY: usize = 16;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub service: Arc<DispatchService>,
    pub validator: Arc<dyn SessionValidator>,
    pub connections: Arc<DriverConnections>,
    pub rooms: Arc<PassengerRooms>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

fn auth_rejection(err: AuthError) -> Response {
    let status = match err {
        AuthError::NotADriver => StatusCode::FORBIDDEN,
        AuthError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::InvalidToken | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
    };
    (status, err.to_string()).into_response()
}

/// Route: `GET /ws/driver?token=...`
pub async fn driver_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<TokenQuery>,
    State(state): State<WebSocketState>,
) -> Response {
    let user = match state.validator.validate(&query.token).await {
        Ok(user) => user,
        Err(err) => return auth_rejection(err),
    };
    let driver_id = match state.service.resolve_driver(&user).await {
        Ok(id) => id,
        Err(err) => return auth_rejection(err),
    };

    ws.on_upgrade(move |socket| handle_driver_socket(socket, driver_id, state))
}

/// Route: `GET /ws/trips/:trip_id?token=...`
pub async fn passenger_ws_handler(
    ws: WebSocketUpgrade,
    Path(trip_id): Path<String>,
    Query(query): Query<TokenQuery>,
    State(state): State<WebSocketState>,
) -> Response {
    let trip_id: TripId = match trip_id.parse() {
        Ok(id) => id,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid trip ID").into_response(),
    };
    let user = match state.validator.validate(&query.token).await {
        Ok(user) => user,
        Err(err) => return auth_rejection(err),
    };
    if let Err(rejection) = authorize_room(&state.service, &user, &trip_id).await {
        return rejection.into_response();
    }

    ws.on_upgrade(move |socket| handle_passenger_socket(socket, trip_id, state))
}

/// The trip must exist and be visible to the session's tenant.
async fn authorize_room(
    service: &DispatchService,
    user: &AuthenticatedUser,
    trip_id: &TripId,
) -> Result<(), (StatusCode, &'static str)> {
    match service.find_trip(trip_id).await {
        Ok(Some(trip)) if user.may_access_tenant(&trip.tenant_id) => Ok(()),
        Ok(Some(_)) => {
            tracing::warn!(%trip_id, user_id = %user.id, "cross-tenant room join denied");
            Err((StatusCode::FORBIDDEN, "Trip belongs to another tenant"))
        }
        Ok(None) => Err((StatusCode::NOT_FOUND, "Trip not found")),
        Err(err) => {
            tracing::error!(%trip_id, error = %err, "trip lookup failed");
            Err((StatusCode::SERVICE_UNAVAILABLE, "Trip lookup failed"))
        }
    }
}

async fn handle_driver_socket(socket: WebSocket, driver_id: DriverId, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let mut queue = state.connections.register(driver_id).await;
    state
        .service
        .driver_connected(driver_id, DriverSubscription::default())
        .await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        driver_id: Some(driver_id),
        trip_id: None,
        timestamp: Timestamp::now().to_rfc3339(),
    });
    if send_message(&mut sender, &connected).await.is_err() {
        drop(queue);
        close_driver(&state, driver_id).await;
        return;
    }
    tracing::info!(%driver_id, "driver connected");

    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_QUEUE_CAPACITY);

    // Single writer: offers pushed by the dispatch core plus direct replies.
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                pushed = queue.recv() => match pushed {
                    Some(pushed) => ServerMessage::from(pushed),
                    None => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };
            if let Err(e) = send_message(&mut sender, &msg).await {
                tracing::debug!(%driver_id, "send error, closing connection: {}", e);
                break;
            }
        }
    });

    let service = state.service.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<DriverClientMessage>(&text) {
                        Ok(msg) => {
                            let reply = handle_driver_message(&service, driver_id, msg).await;
                            if let Some(reply) = reply {
                                if reply_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            let reply = ServerMessage::Error(ErrorMessage::new(
                                "VALIDATION_FAILED",
                                format!("Unrecognized message: {}", e),
                            ));
                            if reply_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(%driver_id, "received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(%driver_id, "driver sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%driver_id, "receive error: {}", e);
                    break;
                }
            }
        }
    });

    // Await the aborted task so the queue receiver is dropped before cleanup.
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    close_driver(&state, driver_id).await;
}

async fn close_driver(state: &WebSocketState, driver_id: DriverId) {
    state.connections.unregister(&driver_id).await;
    if state.connections.is_connected(&driver_id).await {
        // Replaced by a newer connection for the same driver.
        return;
    }
    state.service.driver_disconnected(driver_id).await;
    tracing::info!(%driver_id, "driver disconnected");
}

/// Applies one driver message; returns the direct reply, if any.
async fn handle_driver_message(
    service: &DispatchService,
    driver_id: DriverId,
    msg: DriverClientMessage,
) -> Option<ServerMessage> {
    match msg {
        DriverClientMessage::Ping => Some(ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })),
        DriverClientMessage::Accept { trip_id, sequence } => {
            match service.accept_offer(driver_id, trip_id, sequence).await {
                Ok(receipt) => Some(ServerMessage::OfferAccepted(AcceptedMessage {
                    trip_id: receipt.trip_id,
                    sequence: receipt.sequence,
                })),
                Err(err) => Some(ServerMessage::Error(ErrorMessage::from_dispatch(
                    trip_id, &err,
                ))),
            }
        }
        DriverClientMessage::Decline { trip_id, sequence } => {
            match service.decline_offer(driver_id, trip_id, sequence).await {
                Ok(outcome) => Some(ServerMessage::OfferDeclined(DeclinedMessage {
                    trip_id,
                    sequence,
                    outcome,
                })),
                Err(err) => Some(ServerMessage::Error(ErrorMessage::from_dispatch(
                    trip_id, &err,
                ))),
            }
        }
        DriverClientMessage::Location { lat, lng } => {
            let result = match GeoPoint::new(lat, lng) {
                Ok(point) => service
                    .report_location(driver_id, point)
                    .await
                    .map_err(|e| ErrorMessage::new(e.code.to_string(), e.message)),
                Err(e) => Err(ErrorMessage::new("VALIDATION_FAILED", e.to_string())),
            };
            result.err().map(ServerMessage::Error)
        }
        DriverClientMessage::Availability { availability } => service
            .set_availability(driver_id, availability)
            .await
            .err()
            .map(|e| ServerMessage::Error(ErrorMessage::new(e.code.to_string(), e.message))),
        DriverClientMessage::Subscription(subscription) => {
            service.update_subscription(driver_id, subscription).await;
            None
        }
    }
}

async fn handle_passenger_socket(socket: WebSocket, trip_id: TripId, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = ClientId::new();

    let mut room_rx = state.rooms.join(&trip_id, client_id).await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        driver_id: None,
        trip_id: Some(trip_id),
        timestamp: Timestamp::now().to_rfc3339(),
    });
    if send_message(&mut sender, &connected).await.is_err() {
        drop(room_rx);
        state.rooms.leave(&client_id).await;
        return;
    }

    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_QUEUE_CAPACITY);

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                update = room_rx.recv() => match update {
                    Ok(update) => ServerMessage::TripStatusUpdated(update),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%client_id, skipped, "passenger client lagging");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };
            if let Err(e) = send_message(&mut sender, &msg).await {
                tracing::debug!(%client_id, "send error, closing connection: {}", e);
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if let Ok(PassengerClientMessage::Ping) =
                        serde_json::from_str::<PassengerClientMessage>(&text)
                    {
                        let pong = ServerMessage::Pong(PongMessage {
                            timestamp: Timestamp::now().to_rfc3339(),
                        });
                        if reply_tx.send(pong).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    state.rooms.leave(&client_id).await;
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Router for both socket endpoints.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new()
        .route("/ws/driver", get(driver_ws_handler))
        .route("/ws/trips/:trip_id", get(passenger_ws_handler))
}

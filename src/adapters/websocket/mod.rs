//! WebSocket adapters: the driver offer channel and passenger trip rooms.
//!
//! ```text
//!   OfferBroadcaster / AcceptanceArbiter
//!          │ DriverChannel            │ NotificationSink
//!          ▼                          ▼
//!   DriverConnections           PassengerRooms
//!   driver-1 ─► queue           trip-123 ─► client-a, client-b
//!   driver-2 ─► queue           trip-456 ─► client-c
//!          │                          │
//!          ▼                          ▼
//!     /ws/driver               /ws/trips/:trip_id
//! ```
//!
//! - [`messages`] - wire protocol
//! - [`driver_connections`] - bounded outbound queue per driver
//! - [`passenger_rooms`] - trip-scoped broadcast rooms
//! - [`handler`] - axum upgrade handlers
//! - [`logging_sink`] - log-only and fan-out notification sinks

pub mod driver_connections;
pub mod handler;
pub mod logging_sink;
pub mod messages;
pub mod passenger_rooms;

pub use driver_connections::{DriverConnections, DEFAULT_DRIVER_QUEUE_CAPACITY};
pub use handler::{driver_ws_handler, passenger_ws_handler, websocket_router, WebSocketState};
pub use logging_sink::{FanoutNotificationSink, LoggingNotificationSink};
pub use messages::{
    AcceptedMessage, ConnectedMessage, DeclinedMessage, DriverClientMessage, ErrorMessage,
    PassengerClientMessage, PongMessage, ServerMessage,
};
pub use passenger_rooms::{ClientId, PassengerRooms};

//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the dispatch core and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `TripRepository` - Trip lookup and the conditional assignment write
//! - `OfferAuditLog` - Append-only "offer shown" records
//!
//! ## Delivery Ports
//!
//! - `DriverChannel` - Private push channel per driver
//! - `NotificationSink` - Passenger-facing status updates
//! - `EventPublisher` - Domain events for analytics and audit
//!
//! ## Identity
//!
//! - `SessionValidator` - Access token to authenticated user

mod driver_channel;
mod event_publisher;
mod notification_sink;
mod offer_audit_log;
mod session_validator;
mod trip_repository;

pub use driver_channel::{ChannelError, DriverChannel, DriverMessage};
pub use event_publisher::EventPublisher;
pub use notification_sink::NotificationSink;
pub use offer_audit_log::OfferAuditLog;
pub use session_validator::SessionValidator;
pub use trip_repository::{AssignmentResult, TripRepository};

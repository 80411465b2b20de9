//! In-memory adapters for storage and notification ports.
//!
//! Used by tests and by the server when no database is configured.

mod notification_sink;
mod offer_audit_log;
mod trip_repository;

pub use notification_sink::InMemoryNotificationSink;
pub use offer_audit_log::InMemoryOfferAuditLog;
pub use trip_repository::InMemoryTripRepository;

//! PostgreSQL adapters for the storage ports.
//!
//! - `PostgresTripRepository` - trip reads and the conditional assignment write
//! - `PostgresOfferAuditLog` - append-only "offer shown" rows
//!
//! Schema lives in `migrations/`.

mod offer_audit_log;
mod trip_repository;

pub use offer_audit_log::PostgresOfferAuditLog;
pub use trip_repository::PostgresTripRepository;

//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors and event plumbing
//! that form the vocabulary of the dispatch domain.

mod auth;
mod errors;
mod events;
mod geo;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent};
pub use geo::{haversine_km, offset_north_km, GeoPoint, EARTH_RADIUS_KM};
pub use ids::{DriverId, TenantId, TripId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

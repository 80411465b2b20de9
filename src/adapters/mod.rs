//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the dispatch engine to external systems:
//! - `auth` - HS256 session validation (and a mock for tests)
//! - `events` - in-memory domain event bus
//! - `http` - axum REST routes and router assembly
//! - `memory` - in-memory trip repository, audit log, notification sink
//! - `postgres` - PostgreSQL trip repository and offer audit log
//! - `websocket` - driver offer channel and passenger trip rooms

pub mod auth;
pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;

pub use events::InMemoryEventBus;

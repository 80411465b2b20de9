//! Application layer - the dispatch engine.
//!
//! Coordinates domain logic and ports:
//!
//! - `GeoIndex` - live driver registry and radius queries
//! - `SubscriptionRegistry` - per-connection driver filters
//! - `OfferLifecycleTimer` - cancellable deadline per offer cycle
//! - `AcceptanceArbiter` - per-trip single-writer actors
//! - `OfferBroadcaster` - fan-out of offers to eligible drivers
//! - `DispatchService` - facade used by adapters

pub mod arbiter;
pub mod broadcaster;
pub mod geo_index;
pub mod sequence;
pub mod service;
pub mod subscriptions;
pub mod timer;

pub use arbiter::{AcceptReceipt, AcceptanceArbiter, ArbiterPorts, ArbiterSettings};
pub use broadcaster::{DispatchReceipt, OfferBroadcaster};
pub use geo_index::{EligibleDriver, GeoIndex, DEFAULT_LOCATION_STALENESS};
pub use sequence::SequenceAllocator;
pub use service::DispatchService;
pub use subscriptions::SubscriptionRegistry;
pub use timer::{OfferLifecycleTimer, TimerHandle};

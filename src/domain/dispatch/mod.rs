//! Dispatch domain: offer policy, offers, and the per-trip offer cycle.

mod cycle;
mod errors;
mod events;
mod offer;
mod policy;

pub use cycle::{
    CycleState, CycleStatus, DeclineOutcome, DispatchCycle, OfferOutcome, TripStatusUpdate,
};
pub use errors::DispatchError;
pub use events::{OfferCycleCancelled, OfferCycleExpired, OfferCycleOpened, TripAssigned};
pub use offer::{DispatchSequence, InvalidationReason, Offer, OfferInvalidation, OfferShown};
pub use policy::{
    Difficulty, OfferPolicy, OfferTerms, TierWindows, UrgencyTier, DEFAULT_DRIVER_SHARE_RATE,
};

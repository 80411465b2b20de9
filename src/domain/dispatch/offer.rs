//! Offers pushed to drivers and the records kept about them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DriverId, TenantId, Timestamp, TripId};
use crate::domain::trip::{Place, Trip, TripType};

use super::policy::{Difficulty, OfferTerms, UrgencyTier};

/// Number identifying one offer cycle of a trip.
///
/// Strictly increasing across cycles of the same trip; every timer, offer,
/// accept and decline carries one so stale events can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchSequence(u64);

impl DispatchSequence {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DispatchSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One driver's view of a trip during one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub trip_id: TripId,
    pub driver_id: DriverId,
    pub sequence: DispatchSequence,
    pub trip_type: TripType,
    pub tenant_id: TenantId,
    pub origin: Place,
    pub destination: Place,
    pub departure_time: Timestamp,
    pub seats_total: u32,
    pub seats_available: u32,
    pub price: i64,
    pub estimated_earnings: i64,
    pub distance_km: f64,
    pub urgency: UrgencyTier,
    pub difficulty: Difficulty,
    pub deadline: Timestamp,
}

impl Offer {
    /// Builds the offer for one driver; `distance_km` is driver-to-origin.
    pub fn build(
        trip: &Trip,
        driver_id: DriverId,
        distance_km: f64,
        terms: &OfferTerms,
        sequence: DispatchSequence,
    ) -> Self {
        Self {
            trip_id: trip.id,
            driver_id,
            sequence,
            trip_type: trip.trip_type,
            tenant_id: trip.tenant_id.clone(),
            origin: trip.origin.clone(),
            destination: trip.destination.clone(),
            departure_time: trip.departure_time,
            seats_total: trip.seats_total,
            seats_available: trip.seats_available,
            price: trip.gross_price(),
            estimated_earnings: terms.estimated_earnings,
            distance_km,
            urgency: terms.urgency,
            difficulty: terms.difficulty,
            deadline: terms.deadline,
        }
    }
}

/// Why an outstanding offer stopped being acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    Assigned,
    Expired,
    Cancelled,
}

/// Notice that every offer of a cycle is void.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferInvalidation {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub reason: InvalidationReason,
}

/// Append-only audit row: this driver was shown this offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferShown {
    pub trip_id: TripId,
    pub driver_id: DriverId,
    pub sequence: DispatchSequence,
    pub distance_km: f64,
    pub estimated_earnings: i64,
    pub shown_at: Timestamp,
}

impl OfferShown {
    pub fn from_offer(offer: &Offer, shown_at: Timestamp) -> Self {
        Self {
            trip_id: offer.trip_id,
            driver_id: offer.driver_id,
            sequence: offer.sequence,
            distance_km: offer.distance_km,
            estimated_earnings: offer.estimated_earnings,
            shown_at,
        }
    }
}

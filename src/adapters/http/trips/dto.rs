//! Response bodies for the trip dispatch endpoints.

use serde::Serialize;

use crate::application::{AcceptReceipt, DispatchReceipt};
use crate::domain::dispatch::{DeclineOutcome, DispatchSequence, OfferOutcome, UrgencyTier};
use crate::domain::foundation::{DriverId, Timestamp, TripId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub urgency: UrgencyTier,
    pub deadline: Timestamp,
    pub candidates: usize,
    pub eligible: usize,
    pub sent: usize,
}

impl From<DispatchReceipt> for DispatchResponse {
    fn from(r: DispatchReceipt) -> Self {
        Self {
            trip_id: r.trip_id,
            sequence: r.sequence,
            urgency: r.urgency,
            deadline: r.deadline,
            candidates: r.candidates,
            eligible: r.eligible,
            sent: r.sent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub trip_id: TripId,
    /// Outcome of the open cycle this cancel closed, if there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_cycle: Option<OfferOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub trip_id: TripId,
    pub driver_id: DriverId,
    pub sequence: DispatchSequence,
}

impl From<AcceptReceipt> for AcceptResponse {
    fn from(r: AcceptReceipt) -> Self {
        Self {
            trip_id: r.trip_id,
            driver_id: r.driver_id,
            sequence: r.sequence,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineResponse {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub outcome: DeclineOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_cycles: usize,
    pub connected_drivers: usize,
}

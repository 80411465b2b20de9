//! Messages accepted by a trip's arbiter mailbox.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::domain::dispatch::{DeclineOutcome, DispatchError, DispatchSequence, OfferOutcome};
use crate::domain::foundation::{DriverId, Timestamp, TripId};
use crate::domain::trip::TripType;

/// Confirmation returned to the driver who won a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptReceipt {
    pub trip_id: TripId,
    pub driver_id: DriverId,
    pub sequence: DispatchSequence,
}

pub(crate) enum ArbiterCommand {
    OpenCycle {
        trip_type: TripType,
        sequence: DispatchSequence,
        deadline: Timestamp,
        window: Duration,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    OfferSent {
        driver_id: DriverId,
        sequence: DispatchSequence,
        reply: oneshot::Sender<bool>,
    },
    Accept {
        driver_id: DriverId,
        sequence: DispatchSequence,
        reply: oneshot::Sender<Result<AcceptReceipt, DispatchError>>,
    },
    Decline {
        driver_id: DriverId,
        sequence: DispatchSequence,
        reply: oneshot::Sender<DeclineOutcome>,
    },
    Timeout {
        sequence: DispatchSequence,
    },
    Cancel {
        reply: oneshot::Sender<Option<OfferOutcome>>,
    },
}

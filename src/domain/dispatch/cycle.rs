//! Offer cycle state machine.
//!
//! `DispatchCycle` holds the decision logic for a single trip's offers. It
//! never performs I/O; the arbiter actor feeds it events one at a time and
//! carries out the side effects it asks for. Because the actor is the only
//! owner, every transition here is already linearized.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{DriverId, StateMachine, Timestamp, TripId};

use super::errors::DispatchError;
use super::offer::{DispatchSequence, InvalidationReason};

/// Coarse status of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Open,
    Assigned,
    Expired,
    Cancelled,
}

impl StateMachine for CycleStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CycleStatus::*;
        matches!(
            (self, target),
            (Open, Assigned) | (Open, Expired) | (Open, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CycleStatus::*;
        match self {
            Open => vec![Assigned, Expired, Cancelled],
            Assigned | Expired | Cancelled => vec![],
        }
    }
}

/// Full cycle state, tagged with the data each variant needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Open {
        sequence: DispatchSequence,
        deadline: Timestamp,
    },
    Assigned {
        sequence: DispatchSequence,
        driver_id: DriverId,
    },
    Expired {
        sequence: DispatchSequence,
    },
    Cancelled {
        sequence: DispatchSequence,
    },
}

impl CycleState {
    pub fn status(&self) -> CycleStatus {
        match self {
            CycleState::Open { .. } => CycleStatus::Open,
            CycleState::Assigned { .. } => CycleStatus::Assigned,
            CycleState::Expired { .. } => CycleStatus::Expired,
            CycleState::Cancelled { .. } => CycleStatus::Cancelled,
        }
    }

    pub fn sequence(&self) -> DispatchSequence {
        match self {
            CycleState::Open { sequence, .. }
            | CycleState::Assigned { sequence, .. }
            | CycleState::Expired { sequence }
            | CycleState::Cancelled { sequence } => *sequence,
        }
    }

    /// The error a late accept sees once this state is terminal.
    fn closed_error(&self) -> Option<DispatchError> {
        match self {
            CycleState::Open { .. } => None,
            CycleState::Assigned { .. } => Some(DispatchError::AlreadyAssigned),
            CycleState::Expired { .. } => Some(DispatchError::Expired),
            CycleState::Cancelled { .. } => Some(DispatchError::Cancelled),
        }
    }
}

/// Terminal record of one cycle, produced exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferOutcome {
    Assigned {
        #[serde(rename = "driverId")]
        driver_id: DriverId,
    },
    Expired,
    Cancelled,
}

impl OfferOutcome {
    pub fn invalidation_reason(&self) -> InvalidationReason {
        match self {
            OfferOutcome::Assigned { .. } => InvalidationReason::Assigned,
            OfferOutcome::Expired => InvalidationReason::Expired,
            OfferOutcome::Cancelled => InvalidationReason::Cancelled,
        }
    }
}

/// Passenger-facing status change for a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusUpdate {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub outcome: OfferOutcome,
    pub occurred_at: Timestamp,
}

/// Result of a decline; none of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineOutcome {
    Recorded,
    AlreadyDeclined,
    NoLongerAvailable,
}

/// Decision state of one trip's current (or most recent) cycle.
#[derive(Debug, Clone)]
pub struct DispatchCycle {
    trip_id: TripId,
    state: CycleState,
    offered: HashSet<DriverId>,
    declined: HashSet<DriverId>,
}

impl DispatchCycle {
    pub fn open(trip_id: TripId, sequence: DispatchSequence, deadline: Timestamp) -> Self {
        Self {
            trip_id,
            state: CycleState::Open { sequence, deadline },
            offered: HashSet::new(),
            declined: HashSet::new(),
        }
    }

    /// Starts a new cycle after the previous one expired or was cancelled.
    pub fn reopen(
        &mut self,
        sequence: DispatchSequence,
        deadline: Timestamp,
    ) -> Result<(), DispatchError> {
        match self.state {
            CycleState::Open { .. } => Err(DispatchError::CycleInProgress(self.trip_id)),
            CycleState::Assigned { .. } => Err(DispatchError::AlreadyAssigned),
            CycleState::Expired { .. } | CycleState::Cancelled { .. } => {
                self.state = CycleState::Open { sequence, deadline };
                self.offered.clear();
                self.declined.clear();
                Ok(())
            }
        }
    }

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn sequence(&self) -> DispatchSequence {
        self.state.sequence()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CycleState::Open { .. })
    }

    /// Notes that an offer went out to `driver_id` in cycle `sequence`.
    ///
    /// Returns false if that cycle is no longer open, in which case the
    /// caller should invalidate the offer it just sent.
    pub fn record_offer(&mut self, driver_id: DriverId, sequence: DispatchSequence) -> bool {
        if !self.is_open() || sequence != self.sequence() {
            return false;
        }
        self.offered.insert(driver_id);
        true
    }

    /// True once this cycle was won by `driver_id` at `sequence`.
    pub fn is_assigned_to(&self, driver_id: &DriverId, sequence: DispatchSequence) -> bool {
        matches!(
            self.state,
            CycleState::Assigned { sequence: won_at, driver_id: winner }
                if winner == *driver_id && won_at == sequence
        )
    }

    pub fn was_offered(&self, driver_id: &DriverId) -> bool {
        self.offered.contains(driver_id)
    }

    /// Validates an accept without changing state.
    ///
    /// A stale sequence is reported as `AlreadyAssigned`: from the driver's
    /// point of view the trip is gone either way.
    pub fn check_accept(
        &self,
        driver_id: &DriverId,
        sequence: DispatchSequence,
    ) -> Result<(), DispatchError> {
        if let Some(err) = self.state.closed_error() {
            if sequence == self.sequence() {
                return Err(err);
            }
            return Err(DispatchError::AlreadyAssigned);
        }
        if sequence != self.sequence() {
            return Err(DispatchError::AlreadyAssigned);
        }
        if self.declined.contains(driver_id) {
            return Err(DispatchError::not_eligible("offer was declined"));
        }
        if !self.offered.contains(driver_id) {
            return Err(DispatchError::not_eligible("no offer for this driver in this cycle"));
        }
        Ok(())
    }

    /// Commits the assignment after the durable write succeeded.
    pub fn assign(&mut self, driver_id: DriverId) -> Result<OfferOutcome, DispatchError> {
        self.transition(CycleStatus::Assigned)?;
        self.state = CycleState::Assigned {
            sequence: self.sequence(),
            driver_id,
        };
        Ok(OfferOutcome::Assigned { driver_id })
    }

    /// Removes a driver from this cycle; idempotent.
    pub fn decline(&mut self, driver_id: DriverId, sequence: DispatchSequence) -> DeclineOutcome {
        if !self.is_open() || sequence != self.sequence() {
            return DeclineOutcome::NoLongerAvailable;
        }
        if self.declined.insert(driver_id) {
            DeclineOutcome::Recorded
        } else {
            DeclineOutcome::AlreadyDeclined
        }
    }

    /// Deadline fired. Ignored unless it belongs to the open cycle.
    pub fn expire(&mut self, sequence: DispatchSequence) -> Option<OfferOutcome> {
        if !self.is_open() || sequence != self.sequence() {
            return None;
        }
        self.transition(CycleStatus::Expired).ok()?;
        self.state = CycleState::Expired { sequence };
        Some(OfferOutcome::Expired)
    }

    /// Trip withdrawn. Ignored once the cycle is terminal.
    pub fn cancel(&mut self) -> Option<OfferOutcome> {
        if !self.is_open() {
            return None;
        }
        self.transition(CycleStatus::Cancelled).ok()?;
        self.state = CycleState::Cancelled {
            sequence: self.sequence(),
        };
        Some(OfferOutcome::Cancelled)
    }

    /// Drivers whose offers must be invalidated when the cycle closes.
    ///
    /// Excludes the winner and anyone who already declined.
    pub fn outstanding_offers(&self) -> Vec<DriverId> {
        let winner = match self.state {
            CycleState::Assigned { driver_id, .. } => Some(driver_id),
            _ => None,
        };
        let mut drivers: Vec<DriverId> = self
            .offered
            .iter()
            .filter(|d| Some(**d) != winner && !self.declined.contains(d))
            .copied()
            .collect();
        drivers.sort();
        drivers
    }

    fn transition(&self, target: CycleStatus) -> Result<(), DispatchError> {
        self.state
            .status()
            .transition_to(target)
            .map(|_| ())
            .map_err(|_| {
                self.state
                    .closed_error()
                    .unwrap_or(DispatchError::CycleInProgress(self.trip_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: u64) -> DispatchSequence {
        DispatchSequence::new(n)
    }

    fn open_cycle() -> DispatchCycle {
        DispatchCycle::open(TripId::new(), seq(1), Timestamp::now().plus_secs(60))
    }

    #[test]
    fn status_machine_only_leaves_open() {
        assert!(CycleStatus::Open.can_transition_to(&CycleStatus::Assigned));
        assert!(CycleStatus::Assigned.is_terminal());
        assert!(CycleStatus::Expired.is_terminal());
        assert!(CycleStatus::Cancelled.is_terminal());
    }

    #[test]
    fn first_offered_driver_can_be_assigned() {
        let mut cycle = open_cycle();
        let driver = DriverId::new();
        assert!(cycle.record_offer(driver, seq(1)));

        assert!(cycle.check_accept(&driver, seq(1)).is_ok());
        assert_eq!(cycle.assign(driver).unwrap(), OfferOutcome::Assigned { driver_id: driver });
        assert_eq!(cycle.state().status(), CycleStatus::Assigned);
    }

    #[test]
    fn second_accept_sees_already_assigned() {
        let mut cycle = open_cycle();
        let (a, b) = (DriverId::new(), DriverId::new());
        cycle.record_offer(a, seq(1));
        cycle.record_offer(b, seq(1));
        cycle.assign(a).unwrap();

        assert_eq!(cycle.check_accept(&b, seq(1)), Err(DispatchError::AlreadyAssigned));
        assert_eq!(cycle.assign(b), Err(DispatchError::AlreadyAssigned));
    }

    #[test]
    fn winner_is_recognised_only_for_its_own_cycle() {
        let mut cycle = open_cycle();
        let (a, b) = (DriverId::new(), DriverId::new());
        cycle.record_offer(a, seq(1));
        cycle.assign(a).unwrap();

        assert!(cycle.is_assigned_to(&a, seq(1)));
        assert!(!cycle.is_assigned_to(&a, seq(2)));
        assert!(!cycle.is_assigned_to(&b, seq(1)));
    }

    #[test]
    fn accept_without_offer_is_not_eligible() {
        let cycle = open_cycle();
        let err = cycle.check_accept(&DriverId::new(), seq(1)).unwrap_err();
        assert!(matches!(err, DispatchError::NotEligible { .. }));
    }

    #[test]
    fn stale_sequence_never_changes_state() {
        let mut cycle = open_cycle();
        let driver = DriverId::new();
        cycle.record_offer(driver, seq(1));
        cycle.expire(seq(1)).unwrap();
        cycle.reopen(seq(2), Timestamp::now().plus_secs(60)).unwrap();
        cycle.record_offer(driver, seq(2));

        assert_eq!(cycle.check_accept(&driver, seq(1)), Err(DispatchError::AlreadyAssigned));
        assert_eq!(cycle.expire(seq(1)), None);
        assert!(cycle.is_open());
        assert_eq!(cycle.sequence(), seq(2));
    }

    #[test]
    fn decline_is_idempotent_and_blocks_later_accept() {
        let mut cycle = open_cycle();
        let (a, b) = (DriverId::new(), DriverId::new());
        cycle.record_offer(a, seq(1));
        cycle.record_offer(b, seq(1));

        assert_eq!(cycle.decline(a, seq(1)), DeclineOutcome::Recorded);
        assert_eq!(cycle.decline(a, seq(1)), DeclineOutcome::AlreadyDeclined);
        assert!(matches!(
            cycle.check_accept(&a, seq(1)),
            Err(DispatchError::NotEligible { .. })
        ));
        assert!(cycle.check_accept(&b, seq(1)).is_ok());
    }

    #[test]
    fn expire_then_accept_reports_expired() {
        let mut cycle = open_cycle();
        let driver = DriverId::new();
        cycle.record_offer(driver, seq(1));
        assert_eq!(cycle.expire(seq(1)), Some(OfferOutcome::Expired));
        assert_eq!(cycle.expire(seq(1)), None);
        assert_eq!(cycle.check_accept(&driver, seq(1)), Err(DispatchError::Expired));
    }

    #[test]
    fn cancel_only_from_open() {
        let mut cycle = open_cycle();
        assert_eq!(cycle.cancel(), Some(OfferOutcome::Cancelled));
        assert_eq!(cycle.cancel(), None);
        assert_eq!(cycle.decline(DriverId::new(), seq(1)), DeclineOutcome::NoLongerAvailable);
    }

    #[test]
    fn reopen_rules() {
        let mut cycle = open_cycle();
        assert!(matches!(
            cycle.reopen(seq(2), Timestamp::now()),
            Err(DispatchError::CycleInProgress(_))
        ));

        let driver = DriverId::new();
        cycle.record_offer(driver, seq(1));
        cycle.assign(driver).unwrap();
        assert_eq!(
            cycle.reopen(seq(2), Timestamp::now()),
            Err(DispatchError::AlreadyAssigned)
        );
    }

    #[test]
    fn record_offer_after_close_is_rejected() {
        let mut cycle = open_cycle();
        cycle.cancel();
        assert!(!cycle.record_offer(DriverId::new(), seq(1)));
    }

    #[test]
    fn outstanding_offers_exclude_winner_and_decliners() {
        let mut cycle = open_cycle();
        let (a, b, c) = (DriverId::new(), DriverId::new(), DriverId::new());
        for d in [a, b, c] {
            cycle.record_offer(d, seq(1));
        }
        cycle.decline(c, seq(1));
        cycle.assign(a).unwrap();

        assert_eq!(cycle.outstanding_offers(), vec![b]);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let driver = DriverId::new();
        let json = serde_json::to_value(OfferOutcome::Assigned { driver_id: driver }).unwrap();
        assert_eq!(json["status"], "ASSIGNED");
        assert_eq!(json["driverId"], driver.to_string());
        assert_eq!(serde_json::to_value(OfferOutcome::Expired).unwrap()["status"], "EXPIRED");
    }
}

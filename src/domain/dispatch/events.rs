//! Domain events emitted when an offer cycle opens or closes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DriverId, EventId, Timestamp, TripId};
use crate::domain_event;

use super::offer::DispatchSequence;
use super::policy::UrgencyTier;

/// Offers for a trip went out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCycleOpened {
    pub event_id: EventId,
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub urgency: UrgencyTier,
    pub deadline: Timestamp,
    pub drivers_offered: usize,
    pub opened_at: Timestamp,
}

domain_event!(
    OfferCycleOpened,
    event_type = "trip.offer_cycle.opened.v1",
    aggregate_id = trip_id,
    aggregate_type = "Trip",
    occurred_at = opened_at,
    event_id = event_id
);

/// A driver won the trip and the assignment is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripAssigned {
    pub event_id: EventId,
    pub trip_id: TripId,
    pub driver_id: DriverId,
    pub sequence: DispatchSequence,
    pub assigned_at: Timestamp,
}

domain_event!(
    TripAssigned,
    event_type = "trip.assigned.v1",
    aggregate_id = trip_id,
    aggregate_type = "Trip",
    occurred_at = assigned_at,
    event_id = event_id
);

/// Nobody accepted before the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCycleExpired {
    pub event_id: EventId,
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub expired_at: Timestamp,
}

domain_event!(
    OfferCycleExpired,
    event_type = "trip.offer_cycle.expired.v1",
    aggregate_id = trip_id,
    aggregate_type = "Trip",
    occurred_at = expired_at,
    event_id = event_id
);

/// The trip was withdrawn while offers were out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCycleCancelled {
    pub event_id: EventId,
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub cancelled_at: Timestamp,
}

domain_event!(
    OfferCycleCancelled,
    event_type = "trip.offer_cycle.cancelled.v1",
    aggregate_id = trip_id,
    aggregate_type = "Trip",
    occurred_at = cancelled_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    #[test]
    fn trip_assigned_envelope_carries_trip_as_aggregate() {
        let trip_id = TripId::new();
        let driver_id = DriverId::new();
        let event = TripAssigned {
            event_id: EventId::new(),
            trip_id,
            driver_id,
            sequence: DispatchSequence::new(4),
            assigned_at: Timestamp::now(),
        };

        let envelope = event.to_envelope();

        assert_eq!(envelope.event_type, "trip.assigned.v1");
        assert_eq!(envelope.aggregate_type, "Trip");
        assert_eq!(envelope.aggregate_id, trip_id.to_string());
        assert_eq!(envelope.schema_version, 1);

        let back: TripAssigned = envelope.payload_as().unwrap();
        assert_eq!(back.driver_id, driver_id);
    }

    #[test]
    fn cycle_events_use_distinct_types() {
        let trip_id = TripId::new();
        let expired = OfferCycleExpired {
            event_id: EventId::new(),
            trip_id,
            sequence: DispatchSequence::new(1),
            expired_at: Timestamp::now(),
        };
        let cancelled = OfferCycleCancelled {
            event_id: EventId::new(),
            trip_id,
            sequence: DispatchSequence::new(1),
            cancelled_at: Timestamp::now(),
        };
        assert_ne!(expired.event_type(), cancelled.event_type());
    }
}

//! WebSocket wire protocol for driver and passenger connections.
//!
//! - Server → Driver: `trip.offer.created`, `trip.offer.invalidated`,
//!   accept/decline results
//! - Server → Passenger: `trip.status.updated`
//! - Driver → Server: accept, decline, location, availability, subscription
//!
//! Client messages never carry a driver id; the connection's session
//! decides who is speaking.

use serde::{Deserialize, Serialize};

use crate::domain::dispatch::{
    DeclineOutcome, DispatchError, DispatchSequence, Offer, OfferInvalidation, TripStatusUpdate,
};
use crate::domain::driver::{Availability, DriverSubscription};
use crate::domain::foundation::{DriverId, Timestamp, TripId};
use crate::ports::DriverMessage;

// ============================================
// Server → Client Messages
// ============================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established.
    Connected(ConnectedMessage),

    #[serde(rename = "trip.offer.created")]
    OfferCreated(Offer),

    #[serde(rename = "trip.offer.invalidated")]
    OfferInvalidated(OfferInvalidation),

    #[serde(rename = "trip.status.updated")]
    TripStatusUpdated(TripStatusUpdate),

    #[serde(rename = "offer.accepted")]
    OfferAccepted(AcceptedMessage),

    #[serde(rename = "offer.declined")]
    OfferDeclined(DeclinedMessage),

    /// "Offer gone" and other request failures.
    Error(ErrorMessage),

    Pong(PongMessage),
}

impl From<DriverMessage> for ServerMessage {
    fn from(message: DriverMessage) -> Self {
        match message {
            DriverMessage::OfferCreated(offer) => ServerMessage::OfferCreated(offer),
            DriverMessage::OfferInvalidated(invalidation) => {
                ServerMessage::OfferInvalidated(invalidation)
            }
            DriverMessage::Assigned { trip_id, sequence } => {
                ServerMessage::OfferAccepted(AcceptedMessage { trip_id, sequence })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedMessage {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclinedMessage {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub outcome: DeclineOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    /// True for expected race outcomes the client shows as "offer gone".
    pub offer_gone: bool,
    pub retryable: bool,
    pub timestamp: String,
}

impl ErrorMessage {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            trip_id: None,
            offer_gone: false,
            retryable: false,
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }

    pub fn from_dispatch(trip_id: TripId, err: &DispatchError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            trip_id: Some(trip_id),
            offer_gone: err.is_offer_gone(),
            retryable: err.is_retryable(),
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// Messages a driver client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverClientMessage {
    Ping,

    #[serde(rename = "offer.accept", rename_all = "camelCase")]
    Accept {
        trip_id: TripId,
        sequence: DispatchSequence,
    },

    #[serde(rename = "offer.decline", rename_all = "camelCase")]
    Decline {
        trip_id: TripId,
        sequence: DispatchSequence,
    },

    #[serde(rename = "location.update")]
    Location { lat: f64, lng: f64 },

    #[serde(rename = "availability.update")]
    Availability { availability: Availability },

    #[serde(rename = "subscription.update")]
    Subscription(DriverSubscription),
}

/// Messages a passenger client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PassengerClientMessage {
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch::{InvalidationReason, OfferOutcome};

    #[test]
    fn accept_message_parses_camel_case_fields() {
        let trip_id = TripId::new();
        let json = format!(
            r#"{{"type":"offer.accept","tripId":"{}","sequence":42}}"#,
            trip_id
        );

        let parsed: DriverClientMessage = serde_json::from_str(&json).unwrap();

        match parsed {
            DriverClientMessage::Accept { trip_id: t, sequence } => {
                assert_eq!(t, trip_id);
                assert_eq!(sequence.value(), 42);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn accept_message_ignores_client_supplied_driver_id() {
        let json = format!(
            r#"{{"type":"offer.accept","tripId":"{}","sequence":1,"driverId":"{}"}}"#,
            TripId::new(),
            DriverId::new()
        );
        // Unknown fields are dropped; there is nowhere to put a driver id.
        assert!(serde_json::from_str::<DriverClientMessage>(&json).is_ok());
    }

    #[test]
    fn subscription_message_parses() {
        let json = r#"{"type":"subscription.update","maxDistanceKm":15.0,"tripTypes":["SHARED"]}"#;
        match serde_json::from_str::<DriverClientMessage>(json).unwrap() {
            DriverClientMessage::Subscription(sub) => {
                assert_eq!(sub.max_distance_km, Some(15.0));
                assert!(sub.min_earnings.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalidation_serializes_with_dotted_type() {
        let msg = ServerMessage::OfferInvalidated(OfferInvalidation {
            trip_id: TripId::new(),
            sequence: DispatchSequence::new(9),
            reason: InvalidationReason::Assigned,
        });

        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "trip.offer.invalidated");
        assert_eq!(json["reason"], "assigned");
        assert_eq!(json["sequence"], 9);
    }

    #[test]
    fn status_update_serializes_outcome() {
        let msg = ServerMessage::TripStatusUpdated(TripStatusUpdate {
            trip_id: TripId::new(),
            sequence: DispatchSequence::new(1),
            outcome: OfferOutcome::Expired,
            occurred_at: Timestamp::now(),
        });

        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "trip.status.updated");
        assert_eq!(json["outcome"]["status"], "EXPIRED");
    }

    #[test]
    fn offer_gone_errors_are_flagged() {
        let err = ErrorMessage::from_dispatch(TripId::new(), &DispatchError::AlreadyAssigned);
        assert!(err.offer_gone);
        assert!(!err.retryable);
        assert_eq!(err.code, "ALREADY_ASSIGNED");
    }
}

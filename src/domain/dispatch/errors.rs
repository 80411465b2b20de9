//! Dispatch error taxonomy.

use thiserror::Error;

use crate::domain::foundation::{DomainError, DriverId, ErrorCode, TripId};

/// Errors surfaced by dispatch, accept, decline and cancel.
///
/// `AlreadyAssigned`, `Expired` and `Cancelled` are ordinary race outcomes
/// that drivers see as "offer gone"; they are not faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Driver does not (or no longer) qualifies for this offer.
    #[error("Driver is not eligible for this offer: {reason}")]
    NotEligible { reason: String },

    /// Another driver won the race, or the offer belongs to a closed cycle.
    #[error("Trip is already assigned")]
    AlreadyAssigned,

    /// The acceptance deadline passed before anyone accepted.
    #[error("Offer expired")]
    Expired,

    /// The trip was withdrawn.
    #[error("Trip was cancelled")]
    Cancelled,

    /// The durable assignment write failed; the cycle is still open.
    #[error("Failed to persist assignment after {attempts} attempt(s): {message}")]
    PersistenceFailure { attempts: u32, message: String },

    /// Pushing an offer to one driver failed.
    #[error("Failed to deliver to driver {driver_id}: {message}")]
    ChannelDeliveryFailure { driver_id: DriverId, message: String },

    #[error("Trip not found: {0}")]
    TripNotFound(TripId),

    /// Trip is not in a state that allows looking for a driver.
    #[error("Trip {0} is not dispatchable")]
    NotDispatchable(TripId),

    /// A cycle for this trip is still open.
    #[error("An offer cycle is already open for trip {0}")]
    CycleInProgress(TripId),

    /// The trip's arbiter stopped before it could answer.
    #[error("Arbiter unavailable for trip {0}")]
    ArbiterUnavailable(TripId),

    /// Store failure outside the assignment write (e.g. loading a trip).
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl DispatchError {
    pub fn not_eligible(reason: impl Into<String>) -> Self {
        DispatchError::NotEligible {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::NotEligible { .. } => ErrorCode::NotEligible,
            DispatchError::AlreadyAssigned => ErrorCode::AlreadyAssigned,
            DispatchError::Expired => ErrorCode::OfferExpired,
            DispatchError::Cancelled => ErrorCode::TripCancelled,
            DispatchError::PersistenceFailure { .. } => ErrorCode::DatabaseError,
            DispatchError::ChannelDeliveryFailure { .. } => ErrorCode::ChannelDeliveryFailed,
            DispatchError::TripNotFound(_) => ErrorCode::TripNotFound,
            DispatchError::NotDispatchable(_) => ErrorCode::NotDispatchable,
            DispatchError::CycleInProgress(_) => ErrorCode::CycleInProgress,
            DispatchError::ArbiterUnavailable(_) => ErrorCode::ServiceUnavailable,
            DispatchError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Expected race outcome the client should render as "offer gone".
    pub fn is_offer_gone(&self) -> bool {
        matches!(
            self,
            DispatchError::AlreadyAssigned | DispatchError::Expired | DispatchError::Cancelled
        )
    }

    /// The client may try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::PersistenceFailure { .. } | DispatchError::ArbiterUnavailable(_)
        )
    }
}

impl From<DomainError> for DispatchError {
    fn from(err: DomainError) -> Self {
        DispatchError::Infrastructure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_outcomes_are_offer_gone() {
        assert!(DispatchError::AlreadyAssigned.is_offer_gone());
        assert!(DispatchError::Expired.is_offer_gone());
        assert!(DispatchError::Cancelled.is_offer_gone());
        assert!(!DispatchError::not_eligible("declined").is_offer_gone());
    }

    #[test]
    fn persistence_failure_is_retryable() {
        let err = DispatchError::PersistenceFailure {
            attempts: 3,
            message: "timeout".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert!(!DispatchError::AlreadyAssigned.is_retryable());
    }

    #[test]
    fn displays_human_message() {
        assert_eq!(DispatchError::AlreadyAssigned.to_string(), "Trip is already assigned");
        assert_eq!(
            DispatchError::not_eligible("declined earlier").to_string(),
            "Driver is not eligible for this offer: declined earlier"
        );
    }
}

//! Driver channel port - private push channel to one driver's client.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::dispatch::{DispatchSequence, Offer, OfferInvalidation};
use crate::domain::foundation::{DriverId, TripId};

/// Messages the dispatch core pushes to a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverMessage {
    /// `trip.offer.created`
    OfferCreated(Offer),
    /// `trip.offer.invalidated`
    OfferInvalidated(OfferInvalidation),
    /// `offer.accepted`, pushed when the win was not in the driver's own reply.
    Assigned {
        trip_id: TripId,
        sequence: DispatchSequence,
    },
}

/// Failure to hand a message to one driver's connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Driver {0} is not connected")]
    NotConnected(DriverId),

    #[error("Outbound queue for driver {0} is full")]
    QueueFull(DriverId),

    #[error("Connection for driver {0} is closed")]
    Closed(DriverId),
}

/// Push channel keyed by driver.
///
/// Delivery is best effort: a failure concerns one driver only and must
/// never affect trip state.
#[async_trait]
pub trait DriverChannel: Send + Sync {
    async fn send(&self, driver_id: DriverId, message: DriverMessage) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_channel_is_object_safe() {
        fn _accepts_dyn(_channel: &dyn DriverChannel) {}
    }

    #[test]
    fn channel_error_names_the_driver() {
        let driver = DriverId::new();
        let msg = ChannelError::NotConnected(driver).to_string();
        assert!(msg.contains(&driver.to_string()));
    }
}

//! OfferBroadcaster - fan a trip out to every eligible driver.
//!
//! Order of operations for one dispatch:
//!
//! 1. Evaluate policy (urgency, deadline, earnings)
//! 2. Open the cycle with the arbiter, which arms the deadline timer
//! 3. Query the GeoIndex and apply each driver's live subscription
//! 4. For each surviving driver: register the offer with the arbiter,
//!    then push it on the driver's channel
//! 5. Record "offer shown" in the background
//!
//! Step 4 runs concurrently across drivers. Registration happens before
//! publication, so any accept for an offer is queued behind its
//! registration in the trip's mailbox.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::domain::dispatch::{
    DispatchError, DispatchSequence, Offer, OfferCycleOpened, OfferPolicy, OfferShown,
    UrgencyTier,
};
use crate::domain::foundation::{EventId, SerializableDomainEvent, Timestamp, TripId};
use crate::domain::trip::Trip;
use crate::ports::{DriverChannel, DriverMessage, EventPublisher, OfferAuditLog};

use super::arbiter::AcceptanceArbiter;
use super::geo_index::GeoIndex;
use super::sequence::SequenceAllocator;
use super::subscriptions::SubscriptionRegistry;

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    pub trip_id: TripId,
    pub sequence: DispatchSequence,
    pub urgency: UrgencyTier,
    pub deadline: Timestamp,
    /// Drivers the GeoIndex returned.
    pub candidates: usize,
    /// Candidates left after subscription filters.
    pub eligible: usize,
    /// Offers actually handed to a driver channel.
    pub sent: usize,
}

pub struct OfferBroadcaster {
    policy: OfferPolicy,
    geo: Arc<GeoIndex>,
    subscriptions: Arc<SubscriptionRegistry>,
    sequences: Arc<SequenceAllocator>,
    arbiter: AcceptanceArbiter,
    channel: Arc<dyn DriverChannel>,
    audit: Arc<dyn OfferAuditLog>,
    events: Arc<dyn EventPublisher>,
}

impl OfferBroadcaster {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy: OfferPolicy,
        geo: Arc<GeoIndex>,
        subscriptions: Arc<SubscriptionRegistry>,
        sequences: Arc<SequenceAllocator>,
        arbiter: AcceptanceArbiter,
        channel: Arc<dyn DriverChannel>,
        audit: Arc<dyn OfferAuditLog>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            policy,
            geo,
            subscriptions,
            sequences,
            arbiter,
            channel,
            audit,
            events,
        }
    }

    pub fn policy(&self) -> &OfferPolicy {
        &self.policy
    }

    /// Opens a new offer cycle for `trip` and pushes offers.
    ///
    /// # Errors
    ///
    /// - `NotDispatchable` unless the trip is seeking a driver
    /// - `CycleInProgress` / `AlreadyAssigned` from the arbiter
    ///
    /// Individual delivery failures are logged and only reduce `sent`.
    pub async fn dispatch(&self, trip: &Trip) -> Result<DispatchReceipt, DispatchError> {
        if !trip.is_dispatchable() {
            return Err(DispatchError::NotDispatchable(trip.id));
        }

        let now = Timestamp::now();
        let terms = self.policy.evaluate(
            trip.departure_time,
            now,
            trip.base_price,
            trip.platform_fee,
            trip.route_distance_km(),
        );
        let sequence = self.sequences.next();

        self.arbiter
            .open_cycle(trip.id, trip.trip_type, sequence, terms.deadline, terms.window)
            .await?;

        let candidates = self
            .geo
            .find_eligible_at(
                now,
                &trip.origin.point,
                trip.discovery_radius_km,
                trip.trip_type,
            )
            .await;
        let candidate_count = candidates.len();

        let mut seen = HashSet::new();
        let mut offers = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !seen.insert(candidate.driver_id) {
                continue;
            }
            let admitted = self
                .subscriptions
                .admits(
                    &candidate.driver_id,
                    candidate.distance_km,
                    terms.estimated_earnings,
                    trip.trip_type,
                )
                .await;
            if admitted {
                offers.push(Offer::build(
                    trip,
                    candidate.driver_id,
                    candidate.distance_km,
                    &terms,
                    sequence,
                ));
            }
        }
        let eligible = offers.len();

        let deliveries = join_all(offers.into_iter().map(|offer| self.deliver(offer))).await;
        let sent = deliveries.into_iter().filter(|delivered| *delivered).count();

        tracing::info!(
            trip_id = %trip.id,
            %sequence,
            urgency = terms.urgency.as_str(),
            candidates = candidate_count,
            eligible,
            sent,
            "offers dispatched"
        );

        let opened = OfferCycleOpened {
            event_id: EventId::new(),
            trip_id: trip.id,
            sequence,
            urgency: terms.urgency,
            deadline: terms.deadline,
            drivers_offered: sent,
            opened_at: now,
        };
        let envelope = opened
            .to_envelope()
            .with_correlation_id(format!("{}:{}", trip.id, sequence));
        if let Err(err) = self.events.publish(envelope).await {
            tracing::warn!(
                trip_id = %trip.id,
                error = %err,
                "failed to publish cycle opened event"
            );
        }

        Ok(DispatchReceipt {
            trip_id: trip.id,
            sequence,
            urgency: terms.urgency,
            deadline: terms.deadline,
            candidates: candidate_count,
            eligible,
            sent,
        })
    }

    /// Registers then publishes one offer. Returns whether it went out.
    async fn deliver(&self, offer: Offer) -> bool {
        let (trip_id, driver_id, sequence) = (offer.trip_id, offer.driver_id, offer.sequence);

        if !self.arbiter.offer_sent(trip_id, driver_id, sequence).await {
            tracing::debug!(%trip_id, %driver_id, %sequence, "cycle closed before offer went out");
            return false;
        }

        let shown = OfferShown::from_offer(&offer, Timestamp::now());
        match self
            .channel
            .send(driver_id, DriverMessage::OfferCreated(offer))
            .await
        {
            Ok(()) => {
                let audit = Arc::clone(&self.audit);
                tokio::spawn(async move {
                    if let Err(err) = audit.record_shown(shown).await {
                        tracing::warn!(
                            %trip_id,
                            %driver_id,
                            error = %err,
                            "failed to record offer shown"
                        );
                    }
                });
                true
            }
            Err(err) => {
                tracing::warn!(
                    %trip_id,
                    %driver_id,
                    %sequence,
                    error = %err,
                    "offer delivery failed"
                );
                false
            }
        }
    }
}

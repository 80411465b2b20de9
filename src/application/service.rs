//! DispatchService - the entry point adapters call.
//!
//! Wires the GeoIndex, subscriptions, broadcaster and arbiter together and
//! resolves authenticated users to driver profiles.

use std::sync::Arc;

use crate::domain::dispatch::{DeclineOutcome, DispatchError, DispatchSequence, OfferOutcome};
use crate::domain::driver::{Availability, DriverRecord, DriverSubscription};
use crate::domain::foundation::{
    AuthError, AuthenticatedUser, DomainError, DriverId, GeoPoint, Timestamp, TripId,
};
use crate::domain::trip::Trip;
use crate::ports::TripRepository;

use super::arbiter::{AcceptReceipt, AcceptanceArbiter};
use super::broadcaster::{DispatchReceipt, OfferBroadcaster};
use super::geo_index::GeoIndex;
use super::subscriptions::SubscriptionRegistry;

pub struct DispatchService {
    trips: Arc<dyn TripRepository>,
    geo: Arc<GeoIndex>,
    subscriptions: Arc<SubscriptionRegistry>,
    broadcaster: OfferBroadcaster,
    arbiter: AcceptanceArbiter,
}

impl DispatchService {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        geo: Arc<GeoIndex>,
        subscriptions: Arc<SubscriptionRegistry>,
        broadcaster: OfferBroadcaster,
        arbiter: AcceptanceArbiter,
    ) -> Self {
        Self {
            trips,
            geo,
            subscriptions,
            broadcaster,
            arbiter,
        }
    }

    pub fn geo_index(&self) -> &Arc<GeoIndex> {
        &self.geo
    }

    pub fn arbiter(&self) -> &AcceptanceArbiter {
        &self.arbiter
    }

    pub async fn find_trip(&self, trip_id: &TripId) -> Result<Option<Trip>, DispatchError> {
        Ok(self.trips.find_by_id(trip_id).await?)
    }

    /// Loads a trip and starts an offer cycle for it.
    #[tracing::instrument(skip_all, fields(trip_id = %trip_id))]
    pub async fn dispatch_trip(&self, trip_id: TripId) -> Result<DispatchReceipt, DispatchError> {
        let trip = self
            .trips
            .find_by_id(&trip_id)
            .await?
            .ok_or(DispatchError::TripNotFound(trip_id))?;
        trip.validate()
            .map_err(|err| DispatchError::Infrastructure(err.to_string()))?;
        self.broadcaster.dispatch(&trip).await
    }

    pub async fn accept_offer(
        &self,
        driver_id: DriverId,
        trip_id: TripId,
        sequence: DispatchSequence,
    ) -> Result<AcceptReceipt, DispatchError> {
        self.arbiter.accept(trip_id, driver_id, sequence).await
    }

    pub async fn decline_offer(
        &self,
        driver_id: DriverId,
        trip_id: TripId,
        sequence: DispatchSequence,
    ) -> Result<DeclineOutcome, DispatchError> {
        self.arbiter.decline(trip_id, driver_id, sequence).await
    }

    /// Trip withdrawn by the passenger or organizer.
    #[tracing::instrument(skip_all, fields(trip_id = %trip_id))]
    pub async fn cancel_trip(
        &self,
        trip_id: TripId,
    ) -> Result<Option<OfferOutcome>, DispatchError> {
        self.arbiter.cancel(trip_id).await
    }

    /// Maps a session to its driver profile.
    ///
    /// A user already known to the GeoIndex keeps that profile. Otherwise a
    /// driver claim on the token registers a fresh, offline record.
    pub async fn resolve_driver(&self, user: &AuthenticatedUser) -> Result<DriverId, AuthError> {
        if let Some(driver_id) = self.geo.driver_for_user(&user.id).await {
            return Ok(driver_id);
        }
        let driver_id = user.driver_id.ok_or(AuthError::NotADriver)?;
        self.geo
            .upsert(DriverRecord::new(driver_id, user.id.clone()))
            .await;
        tracing::info!(%driver_id, user_id = %user.id, "driver registered from session");
        Ok(driver_id)
    }

    /// True when the session belongs to a driver, by claim or by registry.
    pub async fn is_driver_session(&self, user: &AuthenticatedUser) -> bool {
        user.driver_id.is_some() || self.geo.driver_for_user(&user.id).await.is_some()
    }

    /// Driver's live connection came up.
    pub async fn driver_connected(&self, driver_id: DriverId, subscription: DriverSubscription) {
        self.subscriptions.subscribe(driver_id, subscription).await;
    }

    /// Connection dropped: forget filters and stop offering.
    pub async fn driver_disconnected(&self, driver_id: DriverId) {
        self.subscriptions.unsubscribe(&driver_id).await;
        if let Err(err) = self
            .geo
            .set_availability(&driver_id, Availability::Offline)
            .await
        {
            tracing::debug!(%driver_id, error = %err, "disconnect for unknown driver");
        }
    }

    pub async fn update_subscription(&self, driver_id: DriverId, subscription: DriverSubscription) {
        self.subscriptions.subscribe(driver_id, subscription).await;
    }

    pub async fn report_location(
        &self,
        driver_id: DriverId,
        point: GeoPoint,
    ) -> Result<(), DomainError> {
        self.geo
            .update_location(&driver_id, point, Timestamp::now())
            .await
    }

    pub async fn set_availability(
        &self,
        driver_id: DriverId,
        availability: Availability,
    ) -> Result<(), DomainError> {
        self.geo.set_availability(&driver_id, availability).await
    }
}

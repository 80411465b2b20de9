//! GeoIndex - live driver registry and radius queries.
//!
//! Location and availability reports mutate the registry; dispatch only
//! reads it. Each query is a point-in-time snapshot taken under a read lock,
//! so queries for different trips run in parallel.
//!
//! Stale, offline and unapproved drivers are skipped by queries but stay in
//! the registry; they become eligible again as soon as they report.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::domain::driver::{ApprovalState, Availability, DriverRecord, LocationFix};
use crate::domain::foundation::{
    haversine_km, DomainError, DriverId, ErrorCode, GeoPoint, Timestamp, UserId,
};
use crate::domain::trip::TripType;

/// Default maximum age of a location fix.
pub const DEFAULT_LOCATION_STALENESS: Duration = Duration::from_secs(300);

/// One result row of an eligibility query.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleDriver {
    pub driver_id: DriverId,
    pub user_id: UserId,
    pub location: GeoPoint,
    pub distance_km: f64,
}

#[derive(Default)]
struct Registry {
    drivers: HashMap<DriverId, DriverRecord>,
    by_user: HashMap<UserId, DriverId>,
}

/// In-memory index of drivers with their last-known location.
pub struct GeoIndex {
    registry: RwLock<Registry>,
    staleness: Duration,
}

impl GeoIndex {
    pub fn new(staleness: Duration) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            staleness,
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Inserts or replaces a driver record.
    pub async fn upsert(&self, record: DriverRecord) {
        let mut registry = self.registry.write().await;
        if let Some(previous) = registry.drivers.get(&record.driver_id) {
            if previous.user_id != record.user_id {
                let old_user = previous.user_id.clone();
                registry.by_user.remove(&old_user);
            }
        }
        registry
            .by_user
            .insert(record.user_id.clone(), record.driver_id);
        registry.drivers.insert(record.driver_id, record);
    }

    /// Records a new location fix for a known driver.
    pub async fn update_location(
        &self,
        driver_id: &DriverId,
        point: GeoPoint,
        reported_at: Timestamp,
    ) -> Result<(), DomainError> {
        self.modify(driver_id, |record| {
            record.location = Some(LocationFix { point, reported_at });
        })
        .await
    }

    pub async fn set_availability(
        &self,
        driver_id: &DriverId,
        availability: Availability,
    ) -> Result<(), DomainError> {
        self.modify(driver_id, |record| record.availability = availability)
            .await
    }

    pub async fn set_approval(
        &self,
        driver_id: &DriverId,
        approval: ApprovalState,
    ) -> Result<(), DomainError> {
        self.modify(driver_id, |record| record.approval = approval)
            .await
    }

    pub async fn remove(&self, driver_id: &DriverId) -> Option<DriverRecord> {
        let mut registry = self.registry.write().await;
        let record = registry.drivers.remove(driver_id)?;
        registry.by_user.remove(&record.user_id);
        Some(record)
    }

    pub async fn get(&self, driver_id: &DriverId) -> Option<DriverRecord> {
        self.registry.read().await.drivers.get(driver_id).cloned()
    }

    /// Driver profile owned by a user account.
    pub async fn driver_for_user(&self, user_id: &UserId) -> Option<DriverId> {
        self.registry.read().await.by_user.get(user_id).copied()
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.drivers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drivers within `radius_km` of `origin` who can take `trip_type` now.
    pub async fn find_eligible(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
        trip_type: TripType,
    ) -> Vec<EligibleDriver> {
        self.find_eligible_at(Timestamp::now(), origin, radius_km, trip_type)
            .await
    }

    /// Same as `find_eligible`, judging freshness against `now`.
    ///
    /// Result order is unspecified.
    pub async fn find_eligible_at(
        &self,
        now: Timestamp,
        origin: &GeoPoint,
        radius_km: f64,
        trip_type: TripType,
    ) -> Vec<EligibleDriver> {
        let max_age = self.staleness.as_secs();
        let registry = self.registry.read().await;

        registry
            .drivers
            .values()
            .filter(|record| record.can_take(trip_type))
            .filter_map(|record| {
                let location = record.fresh_location(&now, max_age)?;
                let distance_km = haversine_km(origin, &location);
                (distance_km <= radius_km).then(|| EligibleDriver {
                    driver_id: record.driver_id,
                    user_id: record.user_id.clone(),
                    location,
                    distance_km,
                })
            })
            .collect()
    }

    async fn modify<F>(&self, driver_id: &DriverId, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut DriverRecord),
    {
        let mut registry = self.registry.write().await;
        let record = registry.drivers.get_mut(driver_id).ok_or_else(|| {
            DomainError::new(ErrorCode::DriverNotFound, "Driver not registered")
                .with_detail("driver_id", driver_id.to_string())
        })?;
        f(record);
        Ok(())
    }
}

impl Default for GeoIndex {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION_STALENESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::driver::Capabilities;
    use crate::domain::foundation::offset_north_km;

    fn origin() -> GeoPoint {
        GeoPoint::new(43.2381, 76.9452).unwrap()
    }

    fn driver_at(point: GeoPoint, reported_at: Timestamp) -> DriverRecord {
        let id = DriverId::new();
        let mut record = DriverRecord::new(id, UserId::new(format!("user-{}", id)).unwrap());
        record.availability = Availability::Available;
        record.location = Some(LocationFix { point, reported_at });
        record
    }

    #[tokio::test]
    async fn finds_driver_inside_radius() {
        let index = GeoIndex::default();
        let record = driver_at(offset_north_km(&origin(), 5.0), Timestamp::now());
        let id = record.driver_id;
        index.upsert(record).await;

        let found = index.find_eligible(&origin(), 25.0, TripType::Private).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver_id, id);
        assert!((found[0].distance_km - 5.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn radius_boundary_is_inclusive_below_and_exclusive_above() {
        let index = GeoIndex::default();
        let now = Timestamp::now();
        let inside = driver_at(offset_north_km(&origin(), 25.0 - 1e-3), now);
        let outside = driver_at(offset_north_km(&origin(), 25.0 + 1e-3), now);
        let inside_id = inside.driver_id;
        index.upsert(inside).await;
        index.upsert(outside).await;

        let found = index
            .find_eligible_at(now, &origin(), 25.0, TripType::Private)
            .await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver_id, inside_id);
    }

    #[tokio::test]
    async fn stale_drivers_are_skipped_but_kept() {
        let index = GeoIndex::new(Duration::from_secs(300));
        let now = Timestamp::now();
        let record = driver_at(origin(), now.minus_secs(301));
        let id = record.driver_id;
        index.upsert(record).await;

        assert!(index
            .find_eligible_at(now, &origin(), 10.0, TripType::Private)
            .await
            .is_empty());
        assert!(index.get(&id).await.is_some());

        index.update_location(&id, origin(), now).await.unwrap();
        assert_eq!(
            index
                .find_eligible_at(now, &origin(), 10.0, TripType::Private)
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn offline_and_unapproved_drivers_are_skipped() {
        let index = GeoIndex::default();
        let offline = driver_at(origin(), Timestamp::now());
        let suspended = driver_at(origin(), Timestamp::now());
        let (offline_id, suspended_id) = (offline.driver_id, suspended.driver_id);
        index.upsert(offline).await;
        index.upsert(suspended).await;

        index
            .set_availability(&offline_id, Availability::Offline)
            .await
            .unwrap();
        index
            .set_approval(&suspended_id, ApprovalState::Suspended)
            .await
            .unwrap();

        assert!(index
            .find_eligible(&origin(), 10.0, TripType::Private)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn capability_filter_matches_trip_type() {
        let index = GeoIndex::default();
        let mut record = driver_at(origin(), Timestamp::now());
        record.capabilities = Capabilities {
            accepts_private: false,
            accepts_shared: true,
        };
        index.upsert(record).await;

        assert!(index
            .find_eligible(&origin(), 10.0, TripType::Private)
            .await
            .is_empty());
        assert_eq!(
            index.find_eligible(&origin(), 10.0, TripType::Shared).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn driver_for_user_follows_upsert_and_remove() {
        let index = GeoIndex::default();
        let record = driver_at(origin(), Timestamp::now());
        let (id, user) = (record.driver_id, record.user_id.clone());
        index.upsert(record).await;

        assert_eq!(index.driver_for_user(&user).await, Some(id));

        index.remove(&id).await;
        assert_eq!(index.driver_for_user(&user).await, None);
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn updating_unknown_driver_fails() {
        let index = GeoIndex::default();
        let err = index
            .set_availability(&DriverId::new(), Availability::Available)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DriverNotFound);
    }
}

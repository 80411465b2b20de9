//! Live per-driver offer filters.
//!
//! A subscription exists only while the driver's connection is up: it is
//! inserted on connect and removed on disconnect.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::driver::DriverSubscription;
use crate::domain::foundation::DriverId;
use crate::domain::trip::TripType;

#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<DriverId, DriverSubscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or replaces) a driver's filters.
    pub async fn subscribe(&self, driver_id: DriverId, subscription: DriverSubscription) {
        self.subscriptions
            .write()
            .await
            .insert(driver_id, subscription);
    }

    pub async fn unsubscribe(&self, driver_id: &DriverId) -> Option<DriverSubscription> {
        self.subscriptions.write().await.remove(driver_id)
    }

    pub async fn get(&self, driver_id: &DriverId) -> Option<DriverSubscription> {
        self.subscriptions.read().await.get(driver_id).cloned()
    }

    /// Whether an offer passes the driver's filters.
    ///
    /// Drivers without a subscription are offered unconditionally.
    pub async fn admits(
        &self,
        driver_id: &DriverId,
        distance_km: f64,
        estimated_earnings: i64,
        trip_type: TripType,
    ) -> bool {
        match self.subscriptions.read().await.get(driver_id) {
            Some(subscription) => subscription.admits(distance_km, estimated_earnings, trip_type),
            None => true,
        }
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drivers_without_subscription_are_admitted() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.admits(&DriverId::new(), 999.0, 0, TripType::Shared).await);
    }

    #[tokio::test]
    async fn subscription_filters_until_unsubscribed() {
        let registry = SubscriptionRegistry::new();
        let driver = DriverId::new();
        registry
            .subscribe(
                driver,
                DriverSubscription {
                    max_distance_km: Some(10.0),
                    min_earnings: None,
                    trip_types: vec![],
                },
            )
            .await;

        assert!(!registry.admits(&driver, 12.0, 1000, TripType::Private).await);

        registry.unsubscribe(&driver).await;
        assert!(registry.admits(&driver, 12.0, 1000, TripType::Private).await);
        assert_eq!(registry.len().await, 0);
    }
}

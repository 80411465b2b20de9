//! Per-connection offer filters a driver sets for themselves.

use serde::{Deserialize, Serialize};

use crate::domain::trip::TripType;

/// Filters supplied by a driver's live connection.
///
/// Held only while the connection is up; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSubscription {
    /// Farthest pickup the driver will drive to.
    #[serde(default)]
    pub max_distance_km: Option<f64>,

    /// Smallest estimated earnings worth taking.
    #[serde(default)]
    pub min_earnings: Option<i64>,

    /// Accepted trip types; empty means all.
    #[serde(default)]
    pub trip_types: Vec<TripType>,
}

impl DriverSubscription {
    /// Whether an offer with these attributes passes every filter.
    pub fn admits(&self, distance_km: f64, estimated_earnings: i64, trip_type: TripType) -> bool {
        if let Some(max) = self.max_distance_km {
            if distance_km > max {
                return false;
            }
        }
        if let Some(min) = self.min_earnings {
            if estimated_earnings < min {
                return false;
            }
        }
        self.trip_types.is_empty() || self.trip_types.contains(&trip_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_subscription_admits_everything() {
        let sub = DriverSubscription::default();
        assert!(sub.admits(500.0, 0, TripType::Private));
    }

    #[test]
    fn distance_cap_is_inclusive() {
        let sub = DriverSubscription {
            max_distance_km: Some(10.0),
            ..Default::default()
        };
        assert!(sub.admits(10.0, 100, TripType::Shared));
        assert!(!sub.admits(10.01, 100, TripType::Shared));
    }

    #[test]
    fn earnings_floor_rejects_cheaper_offers() {
        let sub = DriverSubscription {
            min_earnings: Some(5000),
            ..Default::default()
        };
        assert!(!sub.admits(1.0, 4999, TripType::Shared));
        assert!(sub.admits(1.0, 5000, TripType::Shared));
    }

    #[test]
    fn trip_type_allow_list() {
        let sub = DriverSubscription {
            trip_types: vec![TripType::Private],
            ..Default::default()
        };
        assert!(sub.admits(1.0, 1, TripType::Private));
        assert!(!sub.admits(1.0, 1, TripType::Shared));
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let sub: DriverSubscription =
            serde_json::from_str(r#"{"maxDistanceKm": 15.5, "tripTypes": ["SHARED"]}"#).unwrap();
        assert_eq!(sub.max_distance_km, Some(15.5));
        assert_eq!(sub.min_earnings, None);
        assert_eq!(sub.trip_types, vec![TripType::Shared]);
    }
}

//! Live driver record held by the geo index.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DriverId, GeoPoint, Timestamp, UserId};
use crate::domain::trip::TripType;

/// Whether the driver is taking work right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Available,
    Busy,
    Offline,
}

/// Back-office vetting state of a driver profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

/// Kinds of trips a driver's vehicle and profile can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub accepts_private: bool,
    pub accepts_shared: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            accepts_private: true,
            accepts_shared: true,
        }
    }

    pub fn supports(&self, trip_type: TripType) -> bool {
        match trip_type {
            TripType::Private => self.accepts_private,
            TripType::Shared => self.accepts_shared,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Last-known location with the moment it was reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub reported_at: Timestamp,
}

/// Driver as tracked by the live registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub driver_id: DriverId,
    pub user_id: UserId,
    pub location: Option<LocationFix>,
    pub availability: Availability,
    pub approval: ApprovalState,
    pub capabilities: Capabilities,
}

impl DriverRecord {
    /// New approved, offline driver with no location yet.
    pub fn new(driver_id: DriverId, user_id: UserId) -> Self {
        Self {
            driver_id,
            user_id,
            location: None,
            availability: Availability::Offline,
            approval: ApprovalState::Approved,
            capabilities: Capabilities::all(),
        }
    }

    /// Location fix if it is younger than `max_age_secs` at `now`.
    pub fn fresh_location(&self, now: &Timestamp, max_age_secs: u64) -> Option<GeoPoint> {
        let fix = self.location?;
        let age = now.duration_since(&fix.reported_at);
        if age.num_milliseconds() > (max_age_secs as i64) * 1000 {
            None
        } else {
            Some(fix.point)
        }
    }

    /// Available, approved, and capable of the given trip type.
    pub fn can_take(&self, trip_type: TripType) -> bool {
        self.availability == Availability::Available
            && self.approval == ApprovalState::Approved
            && self.capabilities.supports(trip_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(reported_at: Timestamp) -> DriverRecord {
        let mut record = DriverRecord::new(DriverId::new(), UserId::new("u-1").unwrap());
        record.availability = Availability::Available;
        record.location = Some(LocationFix {
            point: GeoPoint::new(43.25, 76.95).unwrap(),
            reported_at,
        });
        record
    }

    #[test]
    fn capabilities_gate_trip_types() {
        let caps = Capabilities {
            accepts_private: true,
            accepts_shared: false,
        };
        assert!(caps.supports(TripType::Private));
        assert!(!caps.supports(TripType::Shared));
    }

    #[test]
    fn fresh_location_expires_after_bound() {
        let now = Timestamp::now();
        assert!(located(now.minus_secs(60)).fresh_location(&now, 300).is_some());
        assert!(located(now.minus_secs(301)).fresh_location(&now, 300).is_none());
    }

    #[test]
    fn can_take_requires_available_and_approved() {
        let now = Timestamp::now();
        let mut record = located(now);
        assert!(record.can_take(TripType::Shared));

        record.availability = Availability::Busy;
        assert!(!record.can_take(TripType::Shared));

        record.availability = Availability::Available;
        record.approval = ApprovalState::Suspended;
        assert!(!record.can_take(TripType::Shared));
    }
}

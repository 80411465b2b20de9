//! Trip snapshot as seen by the dispatch core.
//!
//! Trips are owned by the booking subsystem. The dispatch core reads them
//! and writes exactly one thing back: the assigned driver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    DriverId, GeoPoint, TenantId, Timestamp, TripId, ValidationError,
};

/// Kind of ride being offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    /// Whole vehicle booked by one party.
    Private,
    /// Seats sold individually.
    Shared,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Private => "PRIVATE",
            TripType::Shared => "SHARED",
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIVATE" => Ok(TripType::Private),
            "SHARED" => Ok(TripType::Shared),
            other => Err(ValidationError::invalid_format(
                "trip_type",
                format!("unknown trip type '{}'", other),
            )),
        }
    }
}

/// Booking-side lifecycle of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Draft,
    SeekingDriver,
    Assigned,
    Cancelled,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Draft => "DRAFT",
            TripStatus::SeekingDriver => "SEEKING_DRIVER",
            TripStatus::Assigned => "ASSIGNED",
            TripStatus::Cancelled => "CANCELLED",
            TripStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for TripStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(TripStatus::Draft),
            "SEEKING_DRIVER" => Ok(TripStatus::SeekingDriver),
            "ASSIGNED" => Ok(TripStatus::Assigned),
            "CANCELLED" => Ok(TripStatus::Cancelled),
            "COMPLETED" => Ok(TripStatus::Completed),
            other => Err(ValidationError::invalid_format(
                "trip_status",
                format!("unknown trip status '{}'", other),
            )),
        }
    }
}

/// Named location on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub point: GeoPoint,
}

impl Place {
    pub fn new(name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            name: name.into(),
            point,
        }
    }
}

/// Read-only trip snapshot.
///
/// # Invariants
///
/// - `driver_id` goes from unset to set exactly once, by the arbiter
/// - `seats_available <= seats_total`
/// - prices are whole currency units and non-negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub tenant_id: TenantId,
    pub origin: Place,
    pub destination: Place,
    pub departure_time: Timestamp,
    pub seats_total: u32,
    pub seats_available: u32,
    pub base_price: i64,
    pub platform_fee: i64,
    pub trip_type: TripType,
    pub discovery_radius_km: f64,
    pub status: TripStatus,
    pub driver_id: Option<DriverId>,
}

impl Trip {
    /// Checks the snapshot's internal consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seats_total == 0 {
            return Err(ValidationError::invalid_format("seats_total", "must be positive"));
        }
        if self.seats_available > self.seats_total {
            return Err(ValidationError::invalid_format(
                "seats_available",
                "cannot exceed seats_total",
            ));
        }
        if self.base_price < 0 || self.platform_fee < 0 {
            return Err(ValidationError::invalid_format("price", "must not be negative"));
        }
        if self.base_price.checked_add(self.platform_fee).is_none() {
            return Err(ValidationError::invalid_format("price", "total is out of range"));
        }
        if !self.discovery_radius_km.is_finite() || self.discovery_radius_km <= 0.0 {
            return Err(ValidationError::invalid_format(
                "discovery_radius_km",
                "must be a positive number",
            ));
        }
        Ok(())
    }

    /// A trip can be offered to drivers only while it is seeking one.
    pub fn is_dispatchable(&self) -> bool {
        self.status == TripStatus::SeekingDriver && self.driver_id.is_none()
    }

    /// Straight-line route length.
    pub fn route_distance_km(&self) -> f64 {
        self.origin.point.distance_km(&self.destination.point)
    }

    /// Total price paid by the passenger side.
    pub fn gross_price(&self) -> i64 {
        self.base_price.saturating_add(self.platform_fee)
    }
}

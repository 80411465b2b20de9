//! Offer policy: urgency, acceptance window, driver earnings, difficulty.
//!
//! Everything here is a pure function of its inputs. No I/O, no shared
//! state, safe to call from any task without locking.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Departure closer than this many hours is urgent.
pub const URGENT_BEFORE_HOURS: f64 = 2.0;
/// Departure closer than this many hours is high urgency.
pub const HIGH_BEFORE_HOURS: f64 = 6.0;
/// Departure closer than this many hours is normal urgency.
pub const NORMAL_BEFORE_HOURS: f64 = 24.0;

/// Share of the gross price the driver keeps.
pub const DEFAULT_DRIVER_SHARE_RATE: f64 = 0.85;

/// Route length breakpoints (km) for difficulty classification.
pub const EASY_BELOW_KM: f64 = 50.0;
pub const NORMAL_BELOW_KM: f64 = 150.0;
pub const CHALLENGING_BELOW_KM: f64 = 400.0;

/// How soon the trip leaves, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Urgent,
    High,
    Normal,
    Low,
}

impl UrgencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Urgent => "urgent",
            UrgencyTier::High => "high",
            UrgencyTier::Normal => "normal",
            UrgencyTier::Low => "low",
        }
    }
}

/// Display-only route difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Challenging,
    Difficult,
}

/// Acceptance window length per urgency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierWindows {
    pub urgent: Duration,
    pub high: Duration,
    pub normal: Duration,
    pub low: Duration,
}

impl Default for TierWindows {
    fn default() -> Self {
        Self {
            urgent: Duration::from_secs(60),
            high: Duration::from_secs(180),
            normal: Duration::from_secs(600),
            low: Duration::from_secs(1800),
        }
    }
}

/// Everything an offer needs from policy for one trip at one moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfferTerms {
    pub urgency: UrgencyTier,
    pub window: Duration,
    pub deadline: Timestamp,
    pub estimated_earnings: i64,
    pub difficulty: Difficulty,
}

/// Stateless policy parameterised by window lengths and the driver share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfferPolicy {
    windows: TierWindows,
    driver_share_rate: f64,
}

impl OfferPolicy {
    /// Creates a policy, rejecting non-monotonic windows or a bad share rate.
    pub fn new(windows: TierWindows, driver_share_rate: f64) -> Result<Self, ValidationError> {
        if windows.urgent.is_zero() {
            return Err(ValidationError::invalid_format("urgent_window", "must be positive"));
        }
        if !(windows.urgent <= windows.high
            && windows.high <= windows.normal
            && windows.normal <= windows.low)
        {
            return Err(ValidationError::invalid_format(
                "tier_windows",
                "must satisfy urgent <= high <= normal <= low",
            ));
        }
        if !(driver_share_rate > 0.0 && driver_share_rate <= 1.0) {
            return Err(ValidationError::out_of_range(
                "driver_share_rate",
                0.0,
                1.0,
                driver_share_rate,
            ));
        }
        Ok(Self {
            windows,
            driver_share_rate,
        })
    }

    pub fn windows(&self) -> &TierWindows {
        &self.windows
    }

    pub fn driver_share_rate(&self) -> f64 {
        self.driver_share_rate
    }

    /// Buckets hours-until-departure; evaluated top-down, so a departure in
    /// the past counts as urgent.
    pub fn urgency_tier(hours_until_departure: f64) -> UrgencyTier {
        if hours_until_departure < URGENT_BEFORE_HOURS {
            UrgencyTier::Urgent
        } else if hours_until_departure < HIGH_BEFORE_HOURS {
            UrgencyTier::High
        } else if hours_until_departure < NORMAL_BEFORE_HOURS {
            UrgencyTier::Normal
        } else {
            UrgencyTier::Low
        }
    }

    pub fn acceptance_window(&self, tier: UrgencyTier) -> Duration {
        match tier {
            UrgencyTier::Urgent => self.windows.urgent,
            UrgencyTier::High => self.windows.high,
            UrgencyTier::Normal => self.windows.normal,
            UrgencyTier::Low => self.windows.low,
        }
    }

    /// `round((base + fee) * share)`.
    pub fn estimated_earnings(&self, base_price: i64, platform_fee: i64) -> i64 {
        (base_price.saturating_add(platform_fee) as f64 * self.driver_share_rate).round() as i64
    }

    pub fn difficulty(route_distance_km: f64) -> Difficulty {
        if route_distance_km < EASY_BELOW_KM {
            Difficulty::Easy
        } else if route_distance_km < NORMAL_BELOW_KM {
            Difficulty::Normal
        } else if route_distance_km < CHALLENGING_BELOW_KM {
            Difficulty::Challenging
        } else {
            Difficulty::Difficult
        }
    }

    pub fn evaluate(
        &self,
        departure_time: Timestamp,
        now: Timestamp,
        base_price: i64,
        platform_fee: i64,
        route_distance_km: f64,
    ) -> OfferTerms {
        let urgency = Self::urgency_tier(departure_time.hours_until(&now));
        let window = self.acceptance_window(urgency);
        OfferTerms {
            urgency,
            window,
            deadline: now.plus_duration(window),
            estimated_earnings: self.estimated_earnings(base_price, platform_fee),
            difficulty: Self::difficulty(route_distance_km),
        }
    }
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self {
            windows: TierWindows::default(),
            driver_share_rate: DEFAULT_DRIVER_SHARE_RATE,
        }
    }
}

//! Dispatch engine tuning: offer windows, earnings share, arbiter limits.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::ArbiterSettings;
use crate::domain::dispatch::{OfferPolicy, TierWindows};

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Acceptance window for departures under 2 hours away
    #[serde(default = "default_urgent_window")]
    pub urgent_window_secs: u64,

    #[serde(default = "default_high_window")]
    pub high_window_secs: u64,

    #[serde(default = "default_normal_window")]
    pub normal_window_secs: u64,

    #[serde(default = "default_low_window")]
    pub low_window_secs: u64,

    /// Fraction of `base_price - platform_fee` shown as driver earnings
    #[serde(default = "default_driver_share_rate")]
    pub driver_share_rate: f64,

    /// Location reports older than this drop out of eligibility
    #[serde(default = "default_location_staleness")]
    pub location_staleness_secs: u64,

    #[serde(default = "default_max_persist_attempts")]
    pub max_persist_attempts: u32,

    #[serde(default = "default_persist_retry_backoff")]
    pub persist_retry_backoff_ms: u64,

    /// Per-trip arbiter mailbox bound
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Outbound queue bound per connected driver
    #[serde(default = "default_driver_channel_capacity")]
    pub driver_channel_capacity: usize,

    /// How long a finished trip actor keeps answering late events
    #[serde(default = "default_closed_cycle_retention")]
    pub closed_cycle_retention_secs: u64,
}

impl DispatchConfig {
    pub fn tier_windows(&self) -> TierWindows {
        TierWindows {
            urgent: Duration::from_secs(self.urgent_window_secs),
            high: Duration::from_secs(self.high_window_secs),
            normal: Duration::from_secs(self.normal_window_secs),
            low: Duration::from_secs(self.low_window_secs),
        }
    }

    pub fn offer_policy(&self) -> Result<OfferPolicy, ValidationError> {
        OfferPolicy::new(self.tier_windows(), self.driver_share_rate)
            .map_err(|e| ValidationError::dispatch("offer_policy", e.to_string()))
    }

    pub fn arbiter_settings(&self) -> ArbiterSettings {
        ArbiterSettings {
            mailbox_capacity: self.mailbox_capacity,
            max_persist_attempts: self.max_persist_attempts,
            persist_retry_backoff: Duration::from_millis(self.persist_retry_backoff_ms),
            closed_cycle_retention: Duration::from_secs(self.closed_cycle_retention_secs),
        }
    }

    pub fn location_staleness(&self) -> Duration {
        Duration::from_secs(self.location_staleness_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.offer_policy()?;
        if self.location_staleness_secs == 0 {
            return Err(ValidationError::dispatch(
                "location_staleness_secs",
                "must be positive",
            ));
        }
        if self.max_persist_attempts == 0 {
            return Err(ValidationError::dispatch(
                "max_persist_attempts",
                "at least one attempt is required",
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(ValidationError::dispatch("mailbox_capacity", "must be positive"));
        }
        if self.driver_channel_capacity == 0 {
            return Err(ValidationError::dispatch(
                "driver_channel_capacity",
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            urgent_window_secs: default_urgent_window(),
            high_window_secs: default_high_window(),
            normal_window_secs: default_normal_window(),
            low_window_secs: default_low_window(),
            driver_share_rate: default_driver_share_rate(),
            location_staleness_secs: default_location_staleness(),
            max_persist_attempts: default_max_persist_attempts(),
            persist_retry_backoff_ms: default_persist_retry_backoff(),
            mailbox_capacity: default_mailbox_capacity(),
            driver_channel_capacity: default_driver_channel_capacity(),
            closed_cycle_retention_secs: default_closed_cycle_retention(),
        }
    }
}

fn default_urgent_window() -> u64 {
    60
}

fn default_high_window() -> u64 {
    180
}

fn default_normal_window() -> u64 {
    600
}

fn default_low_window() -> u64 {
    1800
}

fn default_driver_share_rate() -> f64 {
    crate::domain::dispatch::DEFAULT_DRIVER_SHARE_RATE
}

fn default_location_staleness() -> u64 {
    300
}

fn default_max_persist_attempts() -> u32 {
    3
}

fn default_persist_retry_backoff() -> u64 {
    50
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_driver_channel_capacity() -> usize {
    32
}

fn default_closed_cycle_retention() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.tier_windows(), TierWindows::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.location_staleness(), Duration::from_secs(300));
    }

    #[test]
    fn test_arbiter_settings_conversion() {
        let config = DispatchConfig {
            persist_retry_backoff_ms: 250,
            closed_cycle_retention_secs: 10,
            ..Default::default()
        };
        let settings = config.arbiter_settings();
        assert_eq!(settings.persist_retry_backoff, Duration::from_millis(250));
        assert_eq!(settings.closed_cycle_retention, Duration::from_secs(10));
        assert_eq!(settings.max_persist_attempts, 3);
    }

    #[test]
    fn test_non_monotonic_windows_rejected() {
        let config = DispatchConfig {
            urgent_window_secs: 900,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDispatchSetting {
                field: "offer_policy",
                ..
            })
        ));
    }

    #[test]
    fn test_share_rate_out_of_range_rejected() {
        let config = DispatchConfig {
            driver_share_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_persist_attempts_rejected() {
        let config = DispatchConfig {
            max_persist_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

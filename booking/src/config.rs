//! Configuration for the booking widget.
//!
//! Loads configuration from environment variables with contract defaults:
//! 50 seats, 30-second holds, 1-second expiry sweeps.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Widget configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of seats in the grid (seat ids run 1..=`total_seats`)
    pub total_seats: u32,
    /// How long a hold lives before it lapses, in milliseconds
    pub reservation_timeout_ms: u32,
    /// Cadence of the expiry sweep, in milliseconds
    pub sweep_interval_ms: u32,
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to the contract defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            total_seats: env::var("TOTAL_SEATS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
            reservation_timeout_ms: env::var("RESERVATION_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),
            sweep_interval_ms: env::var("SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Hold lifetime as a [`Duration`]
    #[must_use]
    pub fn reservation_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.reservation_timeout_ms))
    }

    /// Sweep cadence as a [`Duration`]
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.sweep_interval_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_seats: 50,
            reservation_timeout_ms: 30_000,
            sweep_interval_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = Config::default();
        assert_eq!(config.total_seats, 50);
        assert_eq!(config.reservation_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.sweep_interval(), Duration::from_millis(1000));
    }
}

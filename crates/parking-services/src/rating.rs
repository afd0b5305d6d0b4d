//! Rate lookup implementation
//!
//! Resolves the hourly rate charged once a reservation becomes an occupancy
//! session. Rates come from the `reservations` configuration section: a
//! per-garage override when one exists, the default rate otherwise.

use async_trait::async_trait;
use parking_core::{
    config::ReservationConfig, models::Spot, traits::RateLookup, AppError, AppResult,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::constants::RATE_DECIMAL_PLACES;

/// Rate lookup backed by configuration
#[derive(Debug, Clone)]
pub struct ConfiguredRateLookup {
    default_rate: Decimal,
    garage_rates: HashMap<i32, Decimal>,
}

impl ConfiguredRateLookup {
    /// Create a lookup with a single rate for every garage
    pub fn new(default_rate: Decimal) -> Self {
        Self {
            default_rate,
            garage_rates: HashMap::new(),
        }
    }

    /// Override the rate for one garage
    pub fn with_garage_rate(mut self, garage_id: i32, rate: Decimal) -> Self {
        self.garage_rates.insert(garage_id, rate);
        self
    }

    /// Build from the `reservations` configuration section
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a garage key is not an integer id or a
    /// rate is negative or not a finite number.
    pub fn from_config(config: &ReservationConfig) -> AppResult<Self> {
        let mut lookup = Self::new(Self::to_rate("default", config.hourly_rate)?);

        for (key, rate) in &config.garage_rates {
            let garage_id = key.trim().parse::<i32>().map_err(|_| {
                AppError::Config(format!("Invalid garage id in garage_rates: {}", key))
            })?;
            lookup = lookup.with_garage_rate(garage_id, Self::to_rate(key, *rate)?);
        }

        Ok(lookup)
    }

    fn to_rate(name: &str, value: f64) -> AppResult<Decimal> {
        let rate = Decimal::from_f64_retain(value)
            .ok_or_else(|| AppError::Config(format!("Invalid hourly rate for {}: {}", name, value)))?
            .round_dp(RATE_DECIMAL_PLACES);

        if rate.is_sign_negative() {
            return Err(AppError::Config(format!(
                "Hourly rate for {} must not be negative: {}",
                name, value
            )));
        }

        Ok(rate)
    }
}

#[async_trait]
impl RateLookup for ConfiguredRateLookup {
    #[instrument(skip(self, spot), fields(spot_id = spot.id, garage_id = spot.garage_id))]
    async fn hourly_rate(&self, spot: &Spot) -> AppResult<Decimal> {
        let rate = self
            .garage_rates
            .get(&spot.garage_id)
            .copied()
            .unwrap_or(self.default_rate);

        debug!("Hourly rate for spot {}: {}", spot.spot_number, rate);

        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_core::models::SpotStatus;
    use rust_decimal_macros::dec;

    fn spot(garage_id: i32) -> Spot {
        Spot {
            id: 1,
            spot_number: "A-01".to_string(),
            floor_id: 1,
            garage_id,
            garage_name: "Central".to_string(),
            status: SpotStatus::Reserved,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_default_rate() {
        let lookup = ConfiguredRateLookup::from_config(&ReservationConfig::default()).unwrap();
        assert_eq!(lookup.hourly_rate(&spot(1)).await.unwrap(), dec!(5.00));
    }

    #[tokio::test]
    async fn test_garage_override() {
        let mut config = ReservationConfig::default();
        config.garage_rates.insert("7".to_string(), 3.5);

        let lookup = ConfiguredRateLookup::from_config(&config).unwrap();
        assert_eq!(lookup.hourly_rate(&spot(7)).await.unwrap(), dec!(3.50));
        assert_eq!(lookup.hourly_rate(&spot(8)).await.unwrap(), dec!(5.00));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ReservationConfig::default();
        config.garage_rates.insert("downtown".to_string(), 3.5);
        assert!(matches!(
            ConfiguredRateLookup::from_config(&config),
            Err(AppError::Config(_))
        ));

        let config = ReservationConfig {
            hourly_rate: -1.0,
            ..Default::default()
        };
        assert!(ConfiguredRateLookup::from_config(&config).is_err());

        let config = ReservationConfig {
            hourly_rate: f64::NAN,
            ..Default::default()
        };
        assert!(ConfiguredRateLookup::from_config(&config).is_err());
    }
}

//! Vault configuration options.

use crate::fees::FeeSchedule;
use crate::funding::FundingParams;
use crate::types::Usd;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    // Maximum size / collateral ratio a position may hold after an increase
    pub max_leverage: Decimal,
    pub fees: FeeSchedule,
    pub funding: FundingParams,
    // Ceiling on the submitting transaction's resource price; None disables it
    pub max_resource_price: Option<Decimal>,
    // Maximum number of events to retain in memory
    pub max_events: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_leverage: dec!(50),
            fees: FeeSchedule::default(),
            funding: FundingParams::default(),
            max_resource_price: None,
            max_events: 100_000,
        }
    }
}

impl VaultConfig {
    // Create a configuration preset for test deployments
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.max_leverage = dec!(20);
        config.fees.swap_fee_bps = 20;
        config.fees.margin_fee_bps = 5;
        config
    }

    // Create a conservative preset: tighter leverage, pricier liquidations
    pub fn conservative() -> Self {
        let mut config = Self::default();
        config.max_leverage = dec!(30);
        config.fees.liquidation_fee_usd = Usd::new(dec!(10));
        config.funding.funding_rate_factor = dec!(0.0003);
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leverage <= Decimal::ONE {
            return Err(ConfigError::InvalidLeverage {
                reason: "max leverage must exceed 1x".to_string(),
            });
        }

        if self.fees.swap_fee_bps > 500 || self.fees.margin_fee_bps > 500 {
            return Err(ConfigError::InvalidFees {
                reason: "fee above 5% is not plausible".to_string(),
            });
        }

        if self.fees.stable_swap_fee_bps > self.fees.swap_fee_bps {
            return Err(ConfigError::InvalidFees {
                reason: "stable swap fee must not exceed the volatile fee".to_string(),
            });
        }

        if self.fees.liquidation_fee_usd.is_negative() {
            return Err(ConfigError::InvalidFees {
                reason: "liquidation fee cannot be negative".to_string(),
            });
        }

        if self.funding.interval_ms <= 0 {
            return Err(ConfigError::InvalidFunding {
                reason: "funding interval must be positive".to_string(),
            });
        }

        if self.funding.funding_rate_factor < Decimal::ZERO {
            return Err(ConfigError::InvalidFunding {
                reason: "funding rate factor cannot be negative".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLeverage { reason: String },
    InvalidFees { reason: String },
    InvalidFunding { reason: String },
}

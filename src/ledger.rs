// 6.0: per-token pool bookkeeping. PoolState is the heart of the ledger; the
// two binding constraints live here as well:
//   conservation: pool_amount + fee_reserve == custodied balance
//   no over-reservation: reserved_amount <= pool_amount
// both are enforced by the vault operations, never patched up after the fact.

use crate::types::{Timestamp, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolState {
    // token units held as backing collateral, excluding fees
    pub pool_amount: Decimal,
    // token units owed to the protocol, withdrawable separately
    pub fee_reserve: Decimal,
    // debt-unit face value minted against this token
    pub issued_debt: Usd,
    // token units earmarked against open positions, unavailable for redemption
    pub reserved_amount: Decimal,
    // USD notional guaranteed by open long positions beyond their collateral
    pub guaranteed_usd: Usd,
    pub cumulative_funding_rate: Decimal,
    pub last_funding_time: Timestamp,
}

impl PoolState {
    pub fn new() -> Self {
        Self {
            pool_amount: Decimal::ZERO,
            fee_reserve: Decimal::ZERO,
            issued_debt: Usd::zero(),
            reserved_amount: Decimal::ZERO,
            guaranteed_usd: Usd::zero(),
            cumulative_funding_rate: Decimal::ZERO,
            last_funding_time: Timestamp::from_millis(0),
        }
    }

    // what redemption and swaps may draw on
    pub fn available(&self) -> Decimal {
        self.pool_amount - self.reserved_amount
    }

    pub fn utilization(&self) -> Decimal {
        if self.pool_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.reserved_amount / self.pool_amount
        }
    }
}

impl Default for PoolState {
    fn default() -> Self {
        Self::new()
    }
}

// 6.1: conversions at the USD/token boundary. token amounts are always
// truncated to the token's native precision on the way out of USD space,
// so the ledger never owes fractions a token cannot represent.
pub fn tokens_to_usd(amount: Decimal, price: Decimal) -> Usd {
    Usd::new(amount * price)
}

pub fn usd_to_tokens(value: Usd, price: Decimal, decimals: u32) -> Decimal {
    (value.value() / price).trunc_with_scale(decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn available_subtracts_reservation() {
        let mut pool = PoolState::new();
        pool.pool_amount = dec!(100);
        pool.reserved_amount = dec!(30);

        assert_eq!(pool.available(), dec!(70));
        assert_eq!(pool.utilization(), dec!(0.3));
    }

    #[test]
    fn empty_pool_utilization_is_zero() {
        assert_eq!(PoolState::new().utilization(), Decimal::ZERO);
    }

    #[test]
    fn usd_conversion_round_trip() {
        let value = tokens_to_usd(dec!(2), dec!(300));
        assert_eq!(value.value(), dec!(600));

        let back = usd_to_tokens(value, dec!(300), 18);
        assert_eq!(back, dec!(2));
    }

    #[test]
    fn token_conversion_truncates() {
        // 10 USD of a 2-decimal token at price 3
        let tokens = usd_to_tokens(Usd::new(dec!(10)), dec!(3), 2);
        assert_eq!(tokens, dec!(3.33));
    }
}

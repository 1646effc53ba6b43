// 5.0: funding accrual. each token carries a cumulative funding index that
// advances lazily at fixed interval boundaries whenever the token is touched.
// the rate is proportional to utilization (reserved / pool), so funding is paid
// on the token actually reserved, not a global rate. longs pay it on their
// collateral token, shorts on their stable collateral.

use crate::types::{Timestamp, Usd};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingParams {
    // Interval between accruals in milliseconds
    pub interval_ms: i64,
    // Rate per interval at full utilization, as a fraction of position size
    pub funding_rate_factor: Decimal,
}

impl Default for FundingParams {
    fn default() -> Self {
        Self {
            interval_ms: 8 * 3600 * 1000, // 8 hours
            funding_rate_factor: dec!(0.0006),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingAdvance {
    pub accrued: Decimal,
    pub next_funding_time: Timestamp,
}

// 5.1: advance the index to the current interval boundary. the first touch of
// a token only anchors its clock; whole elapsed intervals accrue after that.
pub fn next_funding_rate(
    params: &FundingParams,
    reserved: Decimal,
    pool: Decimal,
    last_funding_time: Timestamp,
    now: Timestamp,
) -> FundingAdvance {
    let boundary = Timestamp::from_millis(now.as_millis() / params.interval_ms * params.interval_ms);

    if last_funding_time.as_millis() == 0 {
        return FundingAdvance {
            accrued: Decimal::ZERO,
            next_funding_time: boundary,
        };
    }

    let elapsed = now.as_millis() - last_funding_time.as_millis();
    let intervals = elapsed / params.interval_ms;
    if intervals <= 0 || pool.is_zero() {
        return FundingAdvance {
            accrued: Decimal::ZERO,
            next_funding_time: last_funding_time,
        };
    }

    let utilization = reserved / pool;
    FundingAdvance {
        accrued: params.funding_rate_factor * utilization * Decimal::from(intervals),
        next_funding_time: boundary,
    }
}

// 5.2: what a position owes since its last touch. the entry snapshot is taken
// from the cumulative index at every increase/decrease.
pub fn funding_fee(size: Usd, cumulative_rate: Decimal, entry_rate: Decimal) -> Usd {
    size.mul(cumulative_rate - entry_rate)
}

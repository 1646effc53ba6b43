// 4.0: fee tables. static basis-point constants set by the configurator.
// stable-to-stable flows get the cheaper schedule; margin fees apply to
// position entry/exit; liquidation charges a fixed USD amount.

use crate::types::{Bps, Usd};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    // Swap fee in basis points for volatile pairs
    pub swap_fee_bps: u32,
    // Swap fee in basis points when both legs are stable
    pub stable_swap_fee_bps: u32,
    // Margin fee in basis points of size delta, on entry and exit
    pub margin_fee_bps: u32,
    // Fixed USD fee paid to the liquidator's receiver
    pub liquidation_fee_usd: Usd,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            swap_fee_bps: 30,       // 0.3%
            stable_swap_fee_bps: 4, // 0.04%
            margin_fee_bps: 10,     // 0.1%
            liquidation_fee_usd: Usd::new(dec!(5)),
        }
    }
}

impl FeeSchedule {
    // issuance and redemption of debt-unit reuse the swap tables;
    // strict-stable tokens qualify for the stable schedule
    pub fn issuance_fee_bps(&self, strict_stable: bool) -> Bps {
        if strict_stable {
            Bps::new(self.stable_swap_fee_bps)
        } else {
            Bps::new(self.swap_fee_bps)
        }
    }

    pub fn swap_fee_bps(&self, in_is_stable: bool, out_is_stable: bool) -> Bps {
        if in_is_stable && out_is_stable {
            Bps::new(self.stable_swap_fee_bps)
        } else {
            Bps::new(self.swap_fee_bps)
        }
    }

    pub fn margin_fee(&self, size_delta: Usd) -> Usd {
        size_delta.mul(Bps::new(self.margin_fee_bps).as_fraction())
    }
}

// token-unit fee cut, truncated to the token's native precision so the
// fee reserve never accrues dust below what the token can represent
pub fn cut_token_fee(amount: Decimal, bps: Bps, decimals: u32) -> (Decimal, Decimal) {
    let fee = (amount * bps.as_fraction()).trunc_with_scale(decimals);
    (amount - fee, fee)
}

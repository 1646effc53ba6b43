// 7.0: open leveraged positions, keyed by (owner, collateral token, index
// token, side). size and collateral are USD values; reserve_amount is the
// collateral-token units the pool holds back for this position.
// 7.1 has the pure price/pnl math at the bottom.

use crate::types::{AccountId, Side, Timestamp, TokenId, Usd, BPS_DIVISOR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub owner: AccountId,
    pub collateral_token: TokenId,
    pub index_token: TokenId,
    pub side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub key: PositionKey,
    // USD notional
    pub size: Usd,
    // USD value net of fees
    pub collateral: Usd,
    // entry / size-weighted average index price
    pub average_price: Decimal,
    // cumulative funding snapshot at last touch
    pub entry_funding_rate: Decimal,
    // collateral-token units reserved in the pool
    pub reserve_amount: Decimal,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Position {
    pub fn new(
        key: PositionKey,
        size: Usd,
        collateral: Usd,
        average_price: Decimal,
        entry_funding_rate: Decimal,
        reserve_amount: Decimal,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            key,
            size,
            collateral,
            average_price,
            entry_funding_rate,
            reserve_amount,
            opened_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_zero()
    }

    pub fn leverage(&self) -> Option<Decimal> {
        if self.collateral.is_zero() {
            None
        } else {
            Some(self.size.value() / self.collateral.value())
        }
    }

    // the pool covers this much beyond the posted collateral (longs only)
    pub fn guarantee(&self) -> Usd {
        self.size.sub(self.collateral)
    }
}

// 7.1: size-weighted average entry price. repeated increases blend the entry
// proportionally to the marginal size.
pub fn next_average_price(
    old_size: Usd,
    old_average: Decimal,
    size_delta: Usd,
    price: Decimal,
) -> Decimal {
    let new_size = old_size.add(size_delta);
    if new_size.is_zero() {
        return old_average;
    }
    (old_size.value() * old_average + size_delta.value() * price) / new_size.value()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnL {
    pub has_profit: bool,
    // always non-negative; has_profit carries the sign
    pub amount: Usd,
}

impl PnL {
    pub fn signed(&self) -> Usd {
        if self.has_profit {
            self.amount
        } else {
            self.amount.negate()
        }
    }
}

// 7.2: pnl for a decreased portion. the raw delta is the relative price move
// scaled by size_delta / average_price. gains below the min-profit threshold
// are deferred to zero; losses never are.
pub fn settled_pnl(
    average_price: Decimal,
    side: Side,
    exit_price: Decimal,
    size_delta: Usd,
    min_profit_bps: u32,
) -> PnL {
    let price_delta = (exit_price - average_price).abs();
    let has_profit = match side {
        Side::Long => exit_price > average_price,
        Side::Short => exit_price < average_price,
    };

    if has_profit {
        let move_bps = price_delta / average_price * Decimal::from(BPS_DIVISOR);
        if move_bps <= Decimal::from(min_profit_bps) {
            return PnL {
                has_profit: true,
                amount: Usd::zero(),
            };
        }
    }

    PnL {
        has_profit,
        amount: Usd::new(size_delta.value() * price_delta / average_price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key() -> PositionKey {
        PositionKey {
            owner: AccountId(1),
            collateral_token: TokenId(1),
            index_token: TokenId(1),
            side: Side::Long,
        }
    }

    #[test]
    fn leverage_and_guarantee() {
        let pos = Position::new(
            key(),
            Usd::new(dec!(90)),
            Usd::new(dec!(9.91)),
            dec!(41000),
            Decimal::ZERO,
            dec!(0.00219512),
            Timestamp::from_millis(0),
        );

        assert_eq!(pos.guarantee().value(), dec!(80.09));
        let leverage = pos.leverage().unwrap();
        assert!(leverage > dec!(9) && leverage < dec!(9.1));
    }

    #[test]
    fn average_price_blends_by_size() {
        // 100 USD at 50000, add 100 USD at 52000
        let avg = next_average_price(
            Usd::new(dec!(100)),
            dec!(50000),
            Usd::new(dec!(100)),
            dec!(52000),
        );
        assert_eq!(avg, dec!(51000));

        // fresh position takes the fill price
        let avg = next_average_price(Usd::zero(), Decimal::ZERO, Usd::new(dec!(100)), dec!(52000));
        assert_eq!(avg, dec!(52000));
    }

    #[test]
    fn long_profit_and_loss() {
        // long from 300, exit at 330: +10% on size
        let pnl = settled_pnl(dec!(300), Side::Long, dec!(330), Usd::new(dec!(90)), 0);
        assert!(pnl.has_profit);
        assert_eq!(pnl.amount.value(), dec!(9));

        let pnl = settled_pnl(dec!(300), Side::Long, dec!(270), Usd::new(dec!(90)), 0);
        assert!(!pnl.has_profit);
        assert_eq!(pnl.amount.value(), dec!(9));
        assert_eq!(pnl.signed().value(), dec!(-9));
    }

    #[test]
    fn short_profit_direction_inverts() {
        let pnl = settled_pnl(dec!(300), Side::Short, dec!(270), Usd::new(dec!(90)), 0);
        assert!(pnl.has_profit);
        assert_eq!(pnl.amount.value(), dec!(9));

        let pnl = settled_pnl(dec!(300), Side::Short, dec!(330), Usd::new(dec!(90)), 0);
        assert!(!pnl.has_profit);
    }

    #[test]
    fn small_gains_are_deferred() {
        // 0.5% move against a 75 bps threshold: profit zeroed
        let pnl = settled_pnl(dec!(1000), Side::Long, dec!(1005), Usd::new(dec!(100)), 75);
        assert!(pnl.has_profit);
        assert!(pnl.amount.is_zero());

        // just past the threshold the full delta is recognized
        let pnl = settled_pnl(dec!(1000), Side::Long, dec!(1008), Usd::new(dec!(100)), 75);
        assert_eq!(pnl.amount.value(), dec!(0.8));
    }

    #[test]
    fn losses_are_never_deferred() {
        let pnl = settled_pnl(dec!(1000), Side::Long, dec!(995), Usd::new(dec!(100)), 75);
        assert!(!pnl.has_profit);
        assert_eq!(pnl.amount.value(), dec!(0.5));
    }

    #[test]
    fn exact_threshold_still_defers() {
        // exactly 75 bps: not strictly above, so deferred
        let pnl = settled_pnl(dec!(10000), Side::Long, dec!(10075), Usd::new(dec!(100)), 75);
        assert!(pnl.amount.is_zero());
    }
}

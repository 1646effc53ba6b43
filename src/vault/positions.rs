// 9.3: the leverage lifecycle. increase blends entry price and reserves pool
// tokens against the new size; decrease settles pnl under the profit-deferral
// rule and releases the reservation pro-rata. every guard runs before any
// ledger mutation.

use super::core::{CallContext, Vault};
use super::results::{DecreaseOutcome, IncreaseOutcome, VaultError};
use crate::events::{
    EventPayload, PositionClosedEvent, PositionDecreasedEvent, PositionIncreasedEvent,
};
use crate::funding::funding_fee;
use crate::ledger::{tokens_to_usd, usd_to_tokens};
use crate::position::{next_average_price, settled_pnl, Position, PositionKey};
use crate::types::{AccountId, Side, TokenId, Usd};
use rust_decimal::Decimal;

impl Vault {
    // 9.3.1: open or grow a position. collateral is the transferred-in delta,
    // valued at the minimum price; entry is priced against the caller.
    pub fn increase_position(
        &mut self,
        ctx: &CallContext,
        owner: AccountId,
        collateral_token: TokenId,
        index_token: TokenId,
        size_delta: Usd,
        side: Side,
    ) -> Result<IncreaseOutcome, VaultError> {
        self.check_resource_price(ctx)?;
        self.require_authorized(ctx.caller, owner)?;

        if size_delta <= Usd::zero() {
            return Err(VaultError::ZeroAmount);
        }

        let collateral_config = self
            .registry
            .whitelisted(collateral_token)
            .ok_or(VaultError::TokenNotWhitelisted(collateral_token))?;
        let collateral_is_stable = collateral_config.is_stable;
        let collateral_decimals = collateral_config.decimals;

        match side {
            Side::Long => {
                if collateral_token != index_token {
                    return Err(VaultError::CollateralMustMatchIndex);
                }
                if collateral_is_stable {
                    return Err(VaultError::CollateralMustNotBeStable);
                }
            }
            Side::Short => {
                if !collateral_is_stable {
                    return Err(VaultError::CollateralMustBeStable);
                }
                let index_config = self
                    .registry
                    .whitelisted(index_token)
                    .ok_or(VaultError::TokenNotWhitelisted(index_token))?;
                if index_config.is_stable {
                    return Err(VaultError::IndexMustNotBeStable);
                }
                if !index_config.is_shortable {
                    return Err(VaultError::IndexNotShortable(index_token));
                }
            }
        }

        self.update_funding(collateral_token)?;

        // entry priced against the caller: longs buy at max, shorts sell at min
        let entry_price = match side {
            Side::Long => self.price_max(index_token)?,
            Side::Short => self.price_min(index_token)?,
        };
        let collateral_price_min = self.price_min(collateral_token)?;
        let collateral_price_max = self.price_max(collateral_token)?;

        let key = PositionKey {
            owner,
            collateral_token,
            index_token,
            side,
        };
        let existing = self.positions.get(&key);
        let (old_size, old_collateral, old_average, old_reserve, old_entry_funding, opened_at) =
            match existing {
                Some(p) => (
                    p.size,
                    p.collateral,
                    p.average_price,
                    p.reserve_amount,
                    p.entry_funding_rate,
                    p.opened_at,
                ),
                None => (
                    Usd::zero(),
                    Usd::zero(),
                    Decimal::ZERO,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    self.current_time,
                ),
            };

        let average_price = if old_size.is_zero() {
            entry_price
        } else {
            next_average_price(old_size, old_average, size_delta, entry_price)
        };

        let collateral_delta_tokens = self.incoming(collateral_token);
        let collateral_delta_usd = tokens_to_usd(collateral_delta_tokens, collateral_price_min);

        let cumulative_funding = self.pool_mut(collateral_token)?.cumulative_funding_rate;
        let pending_funding = funding_fee(old_size, cumulative_funding, old_entry_funding);
        let total_fee = self.config.fees.margin_fee(size_delta).add(pending_funding);

        let new_collateral = old_collateral.add(collateral_delta_usd).sub(total_fee);
        if new_collateral <= Usd::zero() {
            return Err(VaultError::FeesExceedCollateral);
        }
        let new_size = old_size.add(size_delta);

        if new_size <= new_collateral {
            return Err(VaultError::SizeBelowCollateral);
        }
        let leverage = new_size.value() / new_collateral.value();
        if leverage > self.config.max_leverage {
            return Err(VaultError::MaxLeverageExceeded {
                leverage,
                max: self.config.max_leverage,
            });
        }

        // reserve the full size in collateral-token units at the price that
        // yields the most tokens; fees convert at the price that yields fewest
        let reserve_delta = usd_to_tokens(size_delta, collateral_price_min, collateral_decimals);
        let fee_tokens = usd_to_tokens(total_fee, collateral_price_max, collateral_decimals);

        let pool = self.pool_mut(collateral_token)?;
        let new_pool_amount = pool.pool_amount + collateral_delta_tokens - fee_tokens;
        if new_pool_amount < Decimal::ZERO {
            return Err(VaultError::InsufficientPool(collateral_token));
        }
        if pool.reserved_amount + reserve_delta > new_pool_amount {
            return Err(VaultError::ReserveExceedsPool(collateral_token));
        }

        pool.pool_amount = new_pool_amount;
        pool.fee_reserve += fee_tokens;
        pool.reserved_amount += reserve_delta;
        if side.is_long() {
            // the pool must guarantee the USD the position controls beyond
            // its posted collateral
            let guarantee_delta = size_delta.sub(collateral_delta_usd.sub(total_fee));
            pool.guaranteed_usd = pool.guaranteed_usd.add(guarantee_delta);
        }

        let now = self.current_time;
        let mut position = Position::new(
            key,
            new_size,
            new_collateral,
            average_price,
            cumulative_funding,
            old_reserve + reserve_delta,
            opened_at,
        );
        position.updated_at = now;
        self.positions.insert(key, position);

        self.emit_event(EventPayload::PositionIncreased(PositionIncreasedEvent {
            owner,
            collateral_token,
            index_token,
            side,
            size_delta,
            collateral_delta: collateral_delta_usd,
            price: entry_price,
            fee: total_fee,
        }));

        Ok(IncreaseOutcome {
            price: entry_price,
            collateral_added: collateral_delta_usd,
            fee: total_fee,
            reserve_delta,
        })
    }

    // 9.3.2: shrink or close a position. losses always settle in full; gains
    // below the index token's min-profit threshold defer to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn decrease_position(
        &mut self,
        ctx: &CallContext,
        owner: AccountId,
        collateral_token: TokenId,
        index_token: TokenId,
        collateral_delta: Usd,
        size_delta: Usd,
        side: Side,
        receiver: AccountId,
    ) -> Result<DecreaseOutcome, VaultError> {
        self.check_resource_price(ctx)?;
        self.require_authorized(ctx.caller, owner)?;

        let key = PositionKey {
            owner,
            collateral_token,
            index_token,
            side,
        };
        let position = self
            .positions
            .get(&key)
            .cloned()
            .ok_or(VaultError::PositionNotFound)?;

        if size_delta <= Usd::zero() || collateral_delta.is_negative() {
            return Err(VaultError::ZeroAmount);
        }
        if size_delta > position.size {
            return Err(VaultError::SizeExceedsPosition);
        }

        let collateral_decimals = self
            .registry
            .get(collateral_token)
            .ok_or(VaultError::TokenNotWhitelisted(collateral_token))?
            .decimals;
        let min_profit_bps = self
            .registry
            .get(index_token)
            .map(|c| c.min_profit_bps)
            .unwrap_or(0);

        self.update_funding(collateral_token)?;

        // exit priced against the caller: longs sell at min, shorts buy at max
        let exit_price = match side {
            Side::Long => self.price_min(index_token)?,
            Side::Short => self.price_max(index_token)?,
        };
        let collateral_price_max = self.price_max(collateral_token)?;

        let pnl = settled_pnl(
            position.average_price,
            side,
            exit_price,
            size_delta,
            min_profit_bps,
        );

        let cumulative_funding = self.pool_mut(collateral_token)?.cumulative_funding_rate;
        let pending_funding = funding_fee(
            position.size,
            cumulative_funding,
            position.entry_funding_rate,
        );
        let total_fee = self.config.fees.margin_fee(size_delta).add(pending_funding);

        let is_full_close = size_delta == position.size;
        let reserve_delta = if is_full_close {
            position.reserve_amount
        } else {
            position.reserve_amount * size_delta.value() / position.size.value()
        };

        // settle pnl and the requested withdrawal against the collateral
        let mut collateral = position.collateral;
        let mut usd_out = Usd::zero();

        if pnl.has_profit {
            usd_out = usd_out.add(pnl.amount);
        } else {
            if pnl.amount > collateral {
                return Err(VaultError::LossesExceedCollateral);
            }
            collateral = collateral.sub(pnl.amount);
        }

        if collateral_delta > Usd::zero() {
            if collateral_delta > collateral {
                return Err(VaultError::CollateralUnderflow);
            }
            collateral = collateral.sub(collateral_delta);
            usd_out = usd_out.add(collateral_delta);
        }

        if is_full_close {
            usd_out = usd_out.add(collateral);
            collateral = Usd::zero();
        }

        // fee comes out of the settlement when it can, out of collateral when
        // it cannot
        let usd_out_after_fee = if usd_out >= total_fee {
            usd_out.sub(total_fee)
        } else {
            if total_fee > collateral {
                return Err(VaultError::FeesExceedCollateral);
            }
            collateral = collateral.sub(total_fee);
            usd_out
        };

        let new_size = position.size.sub(size_delta);
        if !is_full_close {
            if collateral < self.config.fees.liquidation_fee_usd {
                return Err(VaultError::CollateralBelowLiquidationFee);
            }
            if new_size < collateral {
                return Err(VaultError::SizeBelowCollateral);
            }
        }

        let amount_out = usd_to_tokens(usd_out_after_fee, collateral_price_max, collateral_decimals);
        let fee_tokens = usd_to_tokens(total_fee, collateral_price_max, collateral_decimals);

        let pool = self.pool_mut(collateral_token)?;
        let outflow = amount_out + fee_tokens;
        if pool.pool_amount < outflow {
            return Err(VaultError::InsufficientPool(collateral_token));
        }
        let new_reserved = pool.reserved_amount - reserve_delta;
        if pool.pool_amount - outflow < new_reserved {
            return Err(VaultError::ReserveExceedsPool(collateral_token));
        }

        pool.pool_amount -= outflow;
        pool.fee_reserve += fee_tokens;
        pool.reserved_amount = new_reserved;
        if side.is_long() {
            let old_guarantee = position.size.sub(position.collateral);
            let new_guarantee = if is_full_close {
                Usd::zero()
            } else {
                new_size.sub(collateral)
            };
            pool.guaranteed_usd = pool
                .guaranteed_usd
                .sub(old_guarantee)
                .add(new_guarantee);
        }

        let now = self.current_time;
        if is_full_close {
            self.positions.remove(&key);
        } else {
            let entry = self.positions.get_mut(&key).ok_or(VaultError::PositionNotFound)?;
            entry.size = new_size;
            entry.collateral = collateral;
            entry.entry_funding_rate = cumulative_funding;
            entry.reserve_amount -= reserve_delta;
            entry.updated_at = now;
        }

        self.settle_out(collateral_token, amount_out);

        self.emit_event(EventPayload::PositionDecreased(PositionDecreasedEvent {
            owner,
            collateral_token,
            index_token,
            side,
            size_delta,
            collateral_delta,
            price: exit_price,
            fee: total_fee,
            realized_pnl: pnl.signed(),
            receiver,
        }));
        if is_full_close {
            self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
                owner,
                collateral_token,
                index_token,
                side,
                size: size_delta,
                exit_price,
                realized_pnl: pnl.signed(),
            }));
        }

        Ok(DecreaseOutcome {
            price: exit_price,
            realized_pnl: pnl.signed(),
            fee: total_fee,
            amount_out,
            closed: is_full_close,
        })
    }
}

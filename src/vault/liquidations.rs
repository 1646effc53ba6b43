// 9.4: liquidation. callable by anyone; a position is liquidatable when
// accrued fees alone eat its collateral, when losses plus the fixed fee do,
// or when leverage has drifted past the configured maximum.

use super::core::{CallContext, Vault};
use super::results::{LiquidationOutcome, VaultError};
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::ledger::usd_to_tokens;
use crate::position::{settled_pnl, Position, PositionKey};
use crate::types::{AccountId, Side, TokenId, Usd};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum LiquidationState {
    Solvent,
    // accrued margin + funding fees alone exceed collateral; liquidatable
    // regardless of price
    FeesExceedCollateral { fees: Usd, collateral: Usd },
    // realized loss plus the fixed liquidation fee cannot be covered
    LossesExceedCollateral { shortfall: Usd },
    // fees and losses have thinned collateral past the leverage cap
    LeverageExceeded { leverage: Decimal, max: Decimal },
}

pub(super) struct LiquidationFigures {
    pub mark_price: Decimal,
    pub loss: Usd,
    pub fees: Usd,
}

impl Vault {
    // read-only probe, usable by keepers to find candidates
    pub fn liquidation_state(
        &self,
        owner: AccountId,
        collateral_token: TokenId,
        index_token: TokenId,
        side: Side,
    ) -> Result<LiquidationState, VaultError> {
        let position = self
            .position(owner, collateral_token, index_token, side)
            .ok_or(VaultError::PositionNotFound)?;
        let (state, _) = self.assess_liquidation(position)?;
        Ok(state)
    }

    pub(super) fn assess_liquidation(
        &self,
        position: &Position,
    ) -> Result<(LiquidationState, LiquidationFigures), VaultError> {
        let side = position.key.side;
        let index_token = position.key.index_token;

        // marked against the position, so a liquidation never fires on a
        // price the vault would not also settle at
        let mark_price = match side {
            Side::Long => self.price_min(index_token)?,
            Side::Short => self.price_max(index_token)?,
        };
        let min_profit_bps = self
            .registry
            .get(index_token)
            .map(|c| c.min_profit_bps)
            .unwrap_or(0);

        let pnl = settled_pnl(
            position.average_price,
            side,
            mark_price,
            position.size,
            min_profit_bps,
        );
        let loss = if pnl.has_profit {
            Usd::zero()
        } else {
            pnl.amount
        };

        let fees = self
            .config
            .fees
            .margin_fee(position.size)
            .add(self.position_funding_fee(position));
        let liquidation_fee = self.config.fees.liquidation_fee_usd;

        let figures = LiquidationFigures {
            mark_price,
            loss,
            fees,
        };

        if fees > position.collateral {
            return Ok((
                LiquidationState::FeesExceedCollateral {
                    fees,
                    collateral: position.collateral,
                },
                figures,
            ));
        }

        let owed = loss.add(liquidation_fee);
        if owed > position.collateral {
            return Ok((
                LiquidationState::LossesExceedCollateral {
                    shortfall: owed.sub(position.collateral),
                },
                figures,
            ));
        }

        let remaining = position.collateral.sub(loss).sub(fees);
        if remaining <= Usd::zero() {
            return Ok((
                LiquidationState::LossesExceedCollateral {
                    shortfall: remaining.negate(),
                },
                figures,
            ));
        }
        let leverage = position.size.value() / remaining.value();
        if leverage > self.config.max_leverage {
            return Ok((
                LiquidationState::LeverageExceeded {
                    leverage,
                    max: self.config.max_leverage,
                },
                figures,
            ));
        }

        Ok((LiquidationState::Solvent, figures))
    }

    // 9.4.1: seize the position. fees go to the reserve, the loss stays in the
    // pool, residual collateral goes back to the owner, and the fixed fee is
    // drawn from the pool for the caller-specified receiver.
    pub fn liquidate_position(
        &mut self,
        ctx: &CallContext,
        owner: AccountId,
        collateral_token: TokenId,
        index_token: TokenId,
        side: Side,
        fee_receiver: AccountId,
    ) -> Result<LiquidationOutcome, VaultError> {
        self.check_resource_price(ctx)?;

        self.update_funding(collateral_token)?;

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

        let (state, figures) = self.assess_liquidation(&position)?;
        if state == LiquidationState::Solvent {
            return Err(VaultError::NotLiquidatable);
        }

        let collateral_decimals = self
            .registry
            .get(collateral_token)
            .ok_or(VaultError::TokenNotWhitelisted(collateral_token))?
            .decimals;
        let collateral_price_max = self.price_max(collateral_token)?;
        let liquidation_fee = self.config.fees.liquidation_fee_usd;

        // fees can at most consume the collateral that exists
        let fees_collected = figures.fees.min(position.collateral);
        let residual = position
            .collateral
            .sub(figures.loss)
            .sub(fees_collected)
            .sub(liquidation_fee);
        let residual = if residual.is_negative() {
            Usd::zero()
        } else {
            residual
        };

        let fee_tokens = usd_to_tokens(fees_collected, collateral_price_max, collateral_decimals);
        let residual_tokens = usd_to_tokens(residual, collateral_price_max, collateral_decimals);
        let liquidator_fee_tokens =
            usd_to_tokens(liquidation_fee, collateral_price_max, collateral_decimals);

        let pool = self.pool_mut(collateral_token)?;
        let outflow = fee_tokens + residual_tokens + liquidator_fee_tokens;
        if pool.pool_amount < outflow {
            return Err(VaultError::InsufficientPool(collateral_token));
        }

        pool.reserved_amount -= position.reserve_amount;
        pool.pool_amount -= outflow;
        pool.fee_reserve += fee_tokens;
        if side.is_long() {
            pool.guaranteed_usd = pool.guaranteed_usd.sub(position.guarantee());
        }

        self.positions.remove(&key);

        self.settle_out(collateral_token, residual_tokens);
        self.settle_out(collateral_token, liquidator_fee_tokens);

        self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            owner,
            collateral_token,
            index_token,
            side,
            size: position.size,
            collateral: position.collateral,
            mark_price: figures.mark_price,
            fee_receiver,
            returned_to_owner: residual_tokens,
        }));

        Ok(LiquidationOutcome {
            mark_price: figures.mark_price,
            loss: figures.loss,
            fees_collected,
            returned_to_owner: residual_tokens,
            liquidator_fee_tokens,
        })
    }
}

//! Lazy funding accrual, wired into every operation that touches a token.

use super::core::Vault;
use super::results::VaultError;
use crate::events::{EventPayload, FundingUpdatedEvent};
use crate::funding::{funding_fee, next_funding_rate};
use crate::position::Position;
use crate::types::{TokenId, Usd};

impl Vault {
    // advance the token's cumulative index to the current interval boundary.
    // every public operation calls this before reading funding state, so no
    // cached rate from a previous call is ever used.
    pub fn update_funding(&mut self, token: TokenId) -> Result<(), VaultError> {
        let now = self.current_time;
        let params = self.config.funding.clone();
        let pool = self.pool_mut(token)?;

        let advance = next_funding_rate(
            &params,
            pool.reserved_amount,
            pool.pool_amount,
            pool.last_funding_time,
            now,
        );

        if advance.next_funding_time == pool.last_funding_time {
            return Ok(());
        }

        pool.cumulative_funding_rate += advance.accrued;
        pool.last_funding_time = advance.next_funding_time;
        let cumulative_rate = pool.cumulative_funding_rate;

        if !advance.accrued.is_zero() {
            self.emit_event(EventPayload::FundingUpdated(FundingUpdatedEvent {
                token,
                accrued: advance.accrued,
                cumulative_rate,
            }));
        }
        Ok(())
    }

    // what the position owes against its collateral token's index right now
    pub fn position_funding_fee(&self, position: &Position) -> Usd {
        let Some(pool) = self.pools.get(&position.key.collateral_token) else {
            return Usd::zero();
        };
        funding_fee(
            position.size,
            pool.cumulative_funding_rate,
            position.entry_funding_rate,
        )
    }
}

// 9.1: main vault struct. all state lives here: token registry, oracle,
// per-token pools, the position map, debt-unit ledger and the audit log.
//
// custody model: callers transfer tokens in before invoking an operation; the
// operation computes the raw incoming amount as the delta between the custodied
// balance and pool_amount + fee_reserve, never from a caller-supplied figure.
// outbound transfers are the last step of an operation.

use super::config::VaultConfig;
use super::results::VaultError;
use crate::events::{
    Event, EventId, EventPayload, FeesWithdrawnEvent, TokenClearedEvent, TokenConfiguredEvent,
};
use crate::fees::FeeSchedule;
use crate::funding::FundingParams;
use crate::ledger::{tokens_to_usd, PoolState};
use crate::oracle::{OracleConfig, PriceOracle};
use crate::position::{Position, PositionKey};
use crate::token::{TokenConfig, TokenRegistry};
use crate::types::{AccountId, Side, Timestamp, TokenId, Usd};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

// Per-call metadata supplied by the host: who is invoking, and at what
// transaction resource price the call was submitted.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub caller: AccountId,
    pub resource_price: Decimal,
}

impl CallContext {
    pub fn new(caller: AccountId) -> Self {
        Self {
            caller,
            resource_price: Decimal::ZERO,
        }
    }

    pub fn with_resource_price(caller: AccountId, resource_price: Decimal) -> Self {
        Self {
            caller,
            resource_price,
        }
    }
}

#[derive(Debug)]
pub struct Vault {
    pub(super) config: VaultConfig,
    pub(super) registry: TokenRegistry,
    pub(super) oracle: PriceOracle,
    pub(super) pools: HashMap<TokenId, PoolState>,
    pub(super) positions: HashMap<PositionKey, Position>,
    // true custodied token balances, including fee reserves
    pub(super) custody: HashMap<TokenId, Decimal>,
    // debt-unit ledger: per-account balances and total supply
    pub(super) debt_units: HashMap<AccountId, Usd>,
    pub(super) debt_unit_supply: Usd,
    pub(super) gov: AccountId,
    pub(super) approved_routers: HashSet<AccountId>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl Vault {
    pub fn new(gov: AccountId, config: VaultConfig, oracle_config: OracleConfig) -> Self {
        Self {
            config,
            registry: TokenRegistry::new(),
            oracle: PriceOracle::new(oracle_config),
            pools: HashMap::new(),
            positions: HashMap::new(),
            custody: HashMap::new(),
            debt_units: HashMap::new(),
            debt_unit_supply: Usd::zero(),
            gov,
            approved_routers: HashSet::new(),
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn oracle(&self) -> &PriceOracle {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut PriceOracle {
        &mut self.oracle
    }

    // ---- custody ----

    // the host credits tokens it has received on the vault's behalf.
    // nothing is booked into the pool until an operation claims the delta.
    pub fn transfer_in(&mut self, token: TokenId, amount: Decimal) {
        *self.custody.entry(token).or_insert(Decimal::ZERO) += amount;
    }

    pub fn custody(&self, token: TokenId) -> Decimal {
        self.custody.get(&token).copied().unwrap_or(Decimal::ZERO)
    }

    // unclaimed surplus: custody minus what the ledger accounts for
    pub(super) fn incoming(&self, token: TokenId) -> Decimal {
        let booked = self
            .pools
            .get(&token)
            .map(|p| p.pool_amount + p.fee_reserve)
            .unwrap_or(Decimal::ZERO);
        self.custody(token) - booked
    }

    // the external transfer is the final, failure-tolerant step of an
    // operation: all invariants are validated before this is reached
    pub(super) fn settle_out(&mut self, token: TokenId, amount: Decimal) {
        *self.custody.entry(token).or_insert(Decimal::ZERO) -= amount;
    }

    // ---- accessors ----

    pub fn pool(&self, token: TokenId) -> Option<&PoolState> {
        self.pools.get(&token)
    }

    pub fn token_config(&self, token: TokenId) -> Option<&TokenConfig> {
        self.registry.get(token)
    }

    pub fn position(
        &self,
        owner: AccountId,
        collateral_token: TokenId,
        index_token: TokenId,
        side: Side,
    ) -> Option<&Position> {
        self.positions.get(&PositionKey {
            owner,
            collateral_token,
            index_token,
            side,
        })
    }

    pub fn positions_iter(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }

    pub fn debt_unit_balance(&self, account: AccountId) -> Usd {
        self.debt_units
            .get(&account)
            .copied()
            .unwrap_or(Usd::zero())
    }

    pub fn debt_unit_supply(&self) -> Usd {
        self.debt_unit_supply
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    // ---- pricing ----

    pub(super) fn price_min(&self, token: TokenId) -> Result<Decimal, VaultError> {
        self.price(token, false)
    }

    pub(super) fn price_max(&self, token: TokenId) -> Result<Decimal, VaultError> {
        self.price(token, true)
    }

    fn price(&self, token: TokenId, want_max: bool) -> Result<Decimal, VaultError> {
        let strict_stable = self
            .registry
            .get(token)
            .map(|c| c.is_strict_stable)
            .unwrap_or(false);
        Ok(self
            .oracle
            .quote(token, want_max, strict_stable, self.current_time)?)
    }

    // pool value at the conservative (minimum) price
    pub fn pool_value_usd(&self, token: TokenId) -> Result<Usd, VaultError> {
        let Some(pool) = self.pools.get(&token) else {
            return Ok(Usd::zero());
        };
        if pool.pool_amount.is_zero() {
            return Ok(Usd::zero());
        }
        let price = self.price_min(token)?;
        Ok(tokens_to_usd(pool.pool_amount, price))
    }

    pub fn total_pool_value_usd(&self) -> Result<Usd, VaultError> {
        let mut total = Usd::zero();
        for (token, _) in self.registry.iter_whitelisted() {
            total = total.add(self.pool_value_usd(token)?);
        }
        Ok(total)
    }

    // ---- access control and per-call guards ----

    pub(super) fn require_gov(&self, caller: AccountId) -> Result<(), VaultError> {
        if caller != self.gov {
            return Err(VaultError::Unauthorized(caller));
        }
        Ok(())
    }

    pub(super) fn require_authorized(
        &self,
        caller: AccountId,
        owner: AccountId,
    ) -> Result<(), VaultError> {
        if caller != owner && !self.approved_routers.contains(&caller) {
            return Err(VaultError::Unauthorized(caller));
        }
        Ok(())
    }

    pub(super) fn check_resource_price(&self, ctx: &CallContext) -> Result<(), VaultError> {
        if let Some(ceiling) = self.config.max_resource_price {
            if ctx.resource_price > ceiling {
                return Err(VaultError::ResourcePriceTooHigh {
                    price: ctx.resource_price,
                    ceiling,
                });
            }
        }
        Ok(())
    }

    // ---- governance surface ----
    // callers are expected to sit behind the external time-delay wrapper;
    // the vault itself only checks the governance identity.

    pub fn set_token_config(
        &mut self,
        ctx: &CallContext,
        token: TokenId,
        config: TokenConfig,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;

        // a token must price before it may be whitelisted
        if config.is_whitelisted {
            self.oracle
                .quote(token, false, config.is_strict_stable, self.current_time)?;
        }

        let symbol = config.symbol.clone();
        self.registry.set(token, config);
        self.pools.entry(token).or_insert_with(PoolState::new);

        self.emit_event(EventPayload::TokenConfigured(TokenConfiguredEvent {
            token,
            symbol,
        }));
        Ok(())
    }

    // clearing a token resets all derived pool state to zero
    pub fn clear_token_config(
        &mut self,
        ctx: &CallContext,
        token: TokenId,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;

        if self.registry.clear(token).is_none() {
            return Err(VaultError::TokenNotWhitelisted(token));
        }
        self.pools.insert(token, PoolState::new());

        self.emit_event(EventPayload::TokenCleared(TokenClearedEvent { token }));
        Ok(())
    }

    pub fn set_fees(&mut self, ctx: &CallContext, fees: FeeSchedule) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;
        self.config.fees = fees;
        Ok(())
    }

    pub fn set_funding_rate(
        &mut self,
        ctx: &CallContext,
        funding: FundingParams,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;
        self.config.funding = funding;
        Ok(())
    }

    pub fn set_max_leverage(
        &mut self,
        ctx: &CallContext,
        max_leverage: Decimal,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;
        self.config.max_leverage = max_leverage;
        Ok(())
    }

    pub fn set_max_resource_price(
        &mut self,
        ctx: &CallContext,
        ceiling: Option<Decimal>,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;
        self.config.max_resource_price = ceiling;
        Ok(())
    }

    pub fn add_approved_router(
        &mut self,
        ctx: &CallContext,
        router: AccountId,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;
        self.approved_routers.insert(router);
        Ok(())
    }

    pub fn remove_approved_router(
        &mut self,
        ctx: &CallContext,
        router: AccountId,
    ) -> Result<(), VaultError> {
        self.require_gov(ctx.caller)?;
        self.approved_routers.remove(&router);
        Ok(())
    }

    // pays the accrued fee reserve out and reduces the custodied balance with
    // it, which is the only sanctioned way fee_reserve ever leaves the ledger
    pub fn withdraw_fees(
        &mut self,
        ctx: &CallContext,
        token: TokenId,
        receiver: AccountId,
    ) -> Result<Decimal, VaultError> {
        self.require_gov(ctx.caller)?;

        let pool = self
            .pools
            .get_mut(&token)
            .ok_or(VaultError::TokenNotWhitelisted(token))?;
        let amount = pool.fee_reserve;
        pool.fee_reserve = Decimal::ZERO;
        self.settle_out(token, amount);

        self.emit_event(EventPayload::FeesWithdrawn(FeesWithdrawnEvent {
            token,
            receiver,
            amount,
        }));
        Ok(amount)
    }

    // ---- internals ----

    pub(super) fn pool_mut(&mut self, token: TokenId) -> Result<&mut PoolState, VaultError> {
        self.pools
            .get_mut(&token)
            .ok_or(VaultError::TokenNotWhitelisted(token))
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;
        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

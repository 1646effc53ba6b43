// 9.2: debt-unit issuance, redemption, and swaps. all three follow the same
// shape: claim the transferred-in delta, price it conservatively, charge the
// fee into the reserve, then mutate the ledger only after every guard passed.

use super::core::{CallContext, Vault};
use super::results::{IssueOutcome, RedeemOutcome, SwapOutcome, VaultError};
use crate::events::{DebtIssuedEvent, DebtRedeemedEvent, EventPayload, SwapEvent};
use crate::fees::cut_token_fee;
use crate::ledger::{tokens_to_usd, usd_to_tokens};
use crate::types::{AccountId, Bps, TokenId, Usd};
use rust_decimal::Decimal;

impl Vault {
    // 9.2.1: mint debt-unit against deposited collateral. the incoming amount
    // is the custody delta, valued at the minimum price so the vault never
    // overcredits.
    pub fn issue_debt_unit(
        &mut self,
        ctx: &CallContext,
        token: TokenId,
        receiver: AccountId,
    ) -> Result<IssueOutcome, VaultError> {
        self.check_resource_price(ctx)?;

        let config = self
            .registry
            .whitelisted(token)
            .ok_or(VaultError::TokenNotWhitelisted(token))?;
        let strict_stable = config.is_strict_stable;
        let decimals = config.decimals;
        let weight_bps = config.redemption_weight_bps;

        self.update_funding(token)?;

        let amount_in = self.incoming(token);
        if amount_in <= Decimal::ZERO {
            return Err(VaultError::NothingDeposited);
        }

        let price = self.price_min(token)?;
        let fee_bps = self.config.fees.issuance_fee_bps(strict_stable);
        let (net_amount, fee_tokens) = cut_token_fee(amount_in, fee_bps, decimals);
        let minted = tokens_to_usd(net_amount, price);
        if minted.is_zero() {
            return Err(VaultError::ZeroAmount);
        }

        // the cap is a share of total pool value including this deposit,
        // so it shifts as every token's pool revalues
        let prospective_total = self.total_pool_value_usd()?.add(minted);
        let pool = self.pool_mut(token)?;
        let new_debt = pool.issued_debt.add(minted);
        let cap = prospective_total.mul(Bps::new(weight_bps).as_fraction());
        if new_debt > cap {
            return Err(VaultError::MaxDebtExceeded(token));
        }

        pool.pool_amount += net_amount;
        pool.fee_reserve += fee_tokens;
        pool.issued_debt = new_debt;

        let balance = self.debt_units.entry(receiver).or_insert_with(Usd::zero);
        *balance = balance.add(minted);
        self.debt_unit_supply = self.debt_unit_supply.add(minted);

        self.emit_event(EventPayload::DebtIssued(DebtIssuedEvent {
            token,
            receiver,
            amount_in,
            fee_tokens,
            minted,
        }));

        Ok(IssueOutcome {
            amount_in,
            fee_tokens,
            minted,
        })
    }

    // 9.2.2: burn debt-unit and pay collateral out at the maximum price,
    // so the vault never underprices its own liability.
    pub fn redeem_debt_unit(
        &mut self,
        ctx: &CallContext,
        token: TokenId,
        amount: Usd,
        receiver: AccountId,
    ) -> Result<RedeemOutcome, VaultError> {
        self.check_resource_price(ctx)?;

        let config = self
            .registry
            .whitelisted(token)
            .ok_or(VaultError::TokenNotWhitelisted(token))?;
        let strict_stable = config.is_strict_stable;
        let decimals = config.decimals;

        self.update_funding(token)?;

        if amount <= Usd::zero() {
            return Err(VaultError::ZeroAmount);
        }
        let balance = self.debt_unit_balance(ctx.caller);
        if balance < amount {
            return Err(VaultError::InsufficientDebtUnits {
                requested: amount,
                available: balance,
            });
        }

        let price = self.price_max(token)?;
        let redemption_tokens = usd_to_tokens(amount, price, decimals);
        if redemption_tokens <= Decimal::ZERO {
            return Err(VaultError::ZeroAmount);
        }

        let fee_bps = self.config.fees.issuance_fee_bps(strict_stable);
        let (amount_out, fee_tokens) = cut_token_fee(redemption_tokens, fee_bps, decimals);

        let pool = self.pool_mut(token)?;
        if pool.issued_debt < amount {
            return Err(VaultError::DebtUnderflow(token));
        }
        if pool.pool_amount < redemption_tokens {
            return Err(VaultError::InsufficientPool(token));
        }
        if pool.available() < redemption_tokens {
            return Err(VaultError::ReserveExceedsPool(token));
        }

        pool.pool_amount -= redemption_tokens;
        pool.fee_reserve += fee_tokens;
        pool.issued_debt = pool.issued_debt.sub(amount);

        let caller_balance = self.debt_units.entry(ctx.caller).or_insert_with(Usd::zero);
        *caller_balance = caller_balance.sub(amount);
        self.debt_unit_supply = self.debt_unit_supply.sub(amount);

        self.settle_out(token, amount_out);

        self.emit_event(EventPayload::DebtRedeemed(DebtRedeemedEvent {
            token,
            receiver,
            burned: amount,
            amount_out,
            fee_tokens,
        }));

        Ok(RedeemOutcome {
            burned: amount,
            amount_out,
            fee_tokens,
        })
    }

    // 9.2.3: swap is an implicit issuance on the in-leg and redemption on the
    // out-leg in a single step, with the fee charged on the out-token.
    pub fn swap(
        &mut self,
        ctx: &CallContext,
        token_in: TokenId,
        token_out: TokenId,
        receiver: AccountId,
    ) -> Result<SwapOutcome, VaultError> {
        self.check_resource_price(ctx)?;

        if token_in == token_out {
            return Err(VaultError::IdenticalTokens);
        }

        let in_config = self
            .registry
            .whitelisted(token_in)
            .ok_or(VaultError::TokenNotWhitelisted(token_in))?;
        let in_is_stable = in_config.is_stable;
        let in_weight_bps = in_config.redemption_weight_bps;

        let out_config = self
            .registry
            .whitelisted(token_out)
            .ok_or(VaultError::TokenNotWhitelisted(token_out))?;
        let out_is_stable = out_config.is_stable;
        let out_decimals = out_config.decimals;

        self.update_funding(token_in)?;
        self.update_funding(token_out)?;

        let amount_in = self.incoming(token_in);
        if amount_in <= Decimal::ZERO {
            return Err(VaultError::NothingDeposited);
        }

        let price_in = self.price_min(token_in)?;
        let price_out = self.price_max(token_out)?;
        let value = tokens_to_usd(amount_in, price_in);

        let gross_out = usd_to_tokens(value, price_out, out_decimals);
        if gross_out <= Decimal::ZERO {
            return Err(VaultError::ZeroAmount);
        }

        let fee_bps = self.config.fees.swap_fee_bps(in_is_stable, out_is_stable);
        let (amount_out, fee_tokens) = cut_token_fee(gross_out, fee_bps, out_decimals);

        {
            let pool_out = self.pool_mut(token_out)?;
            if pool_out.pool_amount < gross_out {
                return Err(VaultError::InsufficientPool(token_out));
            }
            if pool_out.available() < gross_out {
                return Err(VaultError::ReserveExceedsPool(token_out));
            }
        }

        // the in-leg debt cap is evaluated against total pool value as it
        // will stand after both legs settle
        let price_out_min = self.price_min(token_out)?;
        let prospective_total = self
            .total_pool_value_usd()?
            .add(tokens_to_usd(amount_in, price_in))
            .sub(tokens_to_usd(gross_out, price_out_min));
        let new_debt_in = {
            let pool_in = self.pool_mut(token_in)?;
            pool_in.issued_debt.add(value)
        };
        let cap = prospective_total.mul(Bps::new(in_weight_bps).as_fraction());
        if new_debt_in > cap {
            return Err(VaultError::MaxDebtExceeded(token_in));
        }

        {
            let pool_in = self.pool_mut(token_in)?;
            pool_in.pool_amount += amount_in;
            pool_in.issued_debt = new_debt_in;
        }
        {
            let pool_out = self.pool_mut(token_out)?;
            pool_out.pool_amount -= gross_out;
            pool_out.fee_reserve += fee_tokens;
            // the out-leg retires debt only down to zero; the pool may hold
            // more of the token than was ever issued against it
            pool_out.issued_debt = if pool_out.issued_debt < value {
                Usd::zero()
            } else {
                pool_out.issued_debt.sub(value)
            };
        }

        self.settle_out(token_out, amount_out);

        self.emit_event(EventPayload::Swapped(SwapEvent {
            token_in,
            token_out,
            receiver,
            amount_in,
            amount_out,
            fee_tokens,
        }));

        Ok(SwapOutcome {
            amount_in,
            amount_out,
            fee_tokens,
        })
    }
}

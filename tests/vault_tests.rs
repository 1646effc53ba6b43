//! Deterministic vault scenarios.
//!
//! Worked ledger examples with hand-computed expectations: issuance and
//! redemption arithmetic, swaps, the position lifecycle on both sides, the
//! profit-deferral rule, and liquidation paths.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vault_core::*;

const GOV: AccountId = AccountId(1);
const ALICE: AccountId = AccountId(2);
const BOB: AccountId = AccountId(3);
const KEEPER: AccountId = AccountId(9);

const BTC: TokenId = TokenId(1);
const USDC: TokenId = TokenId(2);
const TKN: TokenId = TokenId(5);

const HOUR_MS: i64 = 3600 * 1000;

// BTC at 40,000 and USDC at peg, both with full redemption weight so the
// debt cap stays out of the way unless a test lowers it deliberately
fn vault_with_tokens() -> Vault {
    let mut vault = Vault::new(GOV, VaultConfig::default(), OracleConfig::default());
    vault.set_time(Timestamp::from_millis(1_000));

    let t = vault.time();
    vault.oracle_mut().submit_price(BTC, 1, dec!(40000), t);
    vault.oracle_mut().submit_price(USDC, 1, dec!(1), t);

    let gov = CallContext::new(GOV);
    let mut btc = TokenConfig::volatile("WBTC", 8);
    btc.redemption_weight_bps = 10_000;
    let mut usdc = TokenConfig::strict_stable("USDC", 6);
    usdc.redemption_weight_bps = 10_000;
    vault.set_token_config(&gov, BTC, btc).unwrap();
    vault.set_token_config(&gov, USDC, usdc).unwrap();

    vault
}

fn issue(vault: &mut Vault, token: TokenId, amount: Decimal, receiver: AccountId) -> IssueOutcome {
    vault.transfer_in(token, amount);
    vault
        .issue_debt_unit(&CallContext::new(receiver), token, receiver)
        .unwrap()
}

// refresh the whole sample window so directional quotes land on one price
fn set_price(vault: &mut Vault, token: TokenId, price: Decimal) {
    let t = vault.time();
    for _ in 0..3 {
        vault.oracle_mut().submit_price(token, 1, price, t);
    }
}

fn assert_conservation(vault: &Vault, token: TokenId) {
    let pool = vault.pool(token).unwrap();
    assert_eq!(
        pool.pool_amount + pool.fee_reserve,
        vault.custody(token),
        "conservation broken for {:?}",
        token
    );
}

// open the canonical long: 90 USD size against 10 USD of BTC collateral
fn open_reference_long(vault: &mut Vault) {
    vault.transfer_in(BTC, dec!(0.00025));
    vault
        .increase_position(
            &CallContext::new(ALICE),
            ALICE,
            BTC,
            BTC,
            Usd::new(dec!(90)),
            Side::Long,
        )
        .unwrap();
}

#[test]
fn issuance_worked_example() {
    // 100 units of an 18-decimal token at 300 USD, 0.3% fee, 9000 bps weight:
    // minted = 100 * 300 * 0.997 = 29,910
    // fee    = 100 * 300 * 0.003 / 300 = 0.3 token units
    let mut vault = vault_with_tokens();
    issue(&mut vault, USDC, dec!(50000), BOB); // other pool keeps the cap slack

    let t = vault.time();
    vault.oracle_mut().submit_price(TKN, 1, dec!(300), t);
    let mut config = TokenConfig::volatile("TKN", 18);
    config.redemption_weight_bps = 9_000;
    vault
        .set_token_config(&CallContext::new(GOV), TKN, config)
        .unwrap();

    vault.transfer_in(TKN, dec!(100));
    let issued = vault
        .issue_debt_unit(&CallContext::new(ALICE), TKN, ALICE)
        .unwrap();

    assert_eq!(issued.minted.value(), dec!(29910));
    assert_eq!(issued.fee_tokens, dec!(0.3));

    let pool = vault.pool(TKN).unwrap();
    assert_eq!(pool.pool_amount, dec!(99.7));
    assert_eq!(pool.fee_reserve, dec!(0.3));
    assert_eq!(pool.issued_debt.value(), dec!(29910));
    assert_eq!(vault.debt_unit_balance(ALICE).value(), dec!(29910));
    assert_conservation(&vault, TKN);
}

#[test]
fn issuance_rejects_at_debt_cap() {
    // a 9000 bps token alone in the pool can never satisfy its own cap:
    // minted would be 100% of pool value against a 90% ceiling
    let mut vault = vault_with_tokens();

    let t = vault.time();
    vault.oracle_mut().submit_price(TKN, 1, dec!(300), t);
    let mut config = TokenConfig::volatile("TKN", 18);
    config.redemption_weight_bps = 9_000;
    vault
        .set_token_config(&CallContext::new(GOV), TKN, config)
        .unwrap();

    vault.transfer_in(TKN, dec!(100));
    let result = vault.issue_debt_unit(&CallContext::new(ALICE), TKN, ALICE);
    assert_eq!(result, Err(VaultError::MaxDebtExceeded(TKN)));

    // rejection left every balance untouched; the deposit sits unclaimed
    let pool = vault.pool(TKN).unwrap();
    assert_eq!(pool.pool_amount, Decimal::ZERO);
    assert_eq!(pool.fee_reserve, Decimal::ZERO);
    assert_eq!(pool.issued_debt.value(), Decimal::ZERO);
    assert_eq!(vault.debt_unit_balance(ALICE).value(), Decimal::ZERO);
    assert_eq!(vault.custody(TKN), dec!(100));
}

#[test]
fn redemption_pays_out_net_of_fee() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE); // minted 39,880

    let redeemed = vault
        .redeem_debt_unit(&CallContext::new(ALICE), BTC, Usd::new(dec!(20000)), ALICE)
        .unwrap();

    // 20,000 / 40,000 = 0.5 BTC gross, 0.3% fee
    assert_eq!(redeemed.amount_out, dec!(0.4985));
    assert_eq!(redeemed.fee_tokens, dec!(0.0015));

    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.pool_amount, dec!(0.497));
    assert_eq!(pool.fee_reserve, dec!(0.0045));
    assert_eq!(pool.issued_debt.value(), dec!(19880));
    assert_eq!(vault.debt_unit_balance(ALICE).value(), dec!(19880));
    assert_conservation(&vault, BTC);
}

#[test]
fn redemption_rejects_beyond_balance() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    let result = vault.redeem_debt_unit(
        &CallContext::new(BOB),
        BTC,
        Usd::new(dec!(1000)),
        BOB,
    );
    assert!(matches!(
        result,
        Err(VaultError::InsufficientDebtUnits { .. })
    ));
}

#[test]
fn redemption_cannot_drain_reserved_tokens() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(0.01), ALICE); // thin pool: 0.00997 BTC
    open_reference_long(&mut vault); // reserves 0.00225 BTC

    // 350 USD worth is 0.00875 BTC, more than pool minus reservation
    let result = vault.redeem_debt_unit(
        &CallContext::new(ALICE),
        BTC,
        Usd::new(dec!(350)),
        ALICE,
    );
    assert_eq!(result, Err(VaultError::ReserveExceedsPool(BTC)));
}

#[test]
fn swap_moves_debt_between_tokens() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE); // pool 0.997, debt 39,880
    issue(&mut vault, USDC, dec!(50000), ALICE); // pool 49,980, debt 49,980

    vault.transfer_in(BTC, dec!(0.25));
    let swap = vault
        .swap(&CallContext::new(ALICE), BTC, USDC, BOB)
        .unwrap();

    // 0.25 BTC = 10,000 USD -> 10,000 USDC gross, 0.3% fee
    assert_eq!(swap.amount_out, dec!(9997));
    assert_eq!(swap.fee_tokens, dec!(3));

    let btc_pool = vault.pool(BTC).unwrap();
    assert_eq!(btc_pool.pool_amount, dec!(1.247));
    assert_eq!(btc_pool.issued_debt.value(), dec!(49880));

    let usdc_pool = vault.pool(USDC).unwrap();
    assert_eq!(usdc_pool.pool_amount, dec!(39980));
    assert_eq!(usdc_pool.fee_reserve, dec!(23));
    assert_eq!(usdc_pool.issued_debt.value(), dec!(39980));

    assert_conservation(&vault, BTC);
    assert_conservation(&vault, USDC);
}

#[test]
fn stable_pair_swap_uses_cheap_schedule() {
    let mut vault = vault_with_tokens();
    let t = vault.time();
    vault.oracle_mut().submit_price(TokenId(6), 1, dec!(1), t);
    let mut dai = TokenConfig::strict_stable("DAI", 18);
    dai.redemption_weight_bps = 10_000;
    vault
        .set_token_config(&CallContext::new(GOV), TokenId(6), dai)
        .unwrap();

    issue(&mut vault, USDC, dec!(10000), ALICE);
    issue(&mut vault, TokenId(6), dec!(10000), ALICE);

    vault.transfer_in(USDC, dec!(1000));
    let swap = vault
        .swap(&CallContext::new(ALICE), USDC, TokenId(6), ALICE)
        .unwrap();

    // 4 bps instead of 30
    assert_eq!(swap.fee_tokens, dec!(0.4));
    assert_eq!(swap.amount_out, dec!(999.6));
}

#[test]
fn swap_rejects_when_output_pool_is_reserved() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(0.01), ALICE);
    issue(&mut vault, USDC, dec!(50000), ALICE);
    open_reference_long(&mut vault); // 0.00225 of 0.01025 BTC reserved

    // 350 USDC asks for 0.00875 BTC out; only ~0.008 is unreserved
    vault.transfer_in(USDC, dec!(350));
    let result = vault.swap(&CallContext::new(ALICE), USDC, BTC, ALICE);
    assert_eq!(result, Err(VaultError::ReserveExceedsPool(BTC)));
}

#[test]
fn swap_rejects_same_token() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    vault.transfer_in(BTC, dec!(0.1));
    let result = vault.swap(&CallContext::new(ALICE), BTC, BTC, ALICE);
    assert_eq!(result, Err(VaultError::IdenticalTokens));
}

#[test]
fn long_open_worked_example() {
    // size 90 USD against 10 USD of collateral at entry 40,000 and a 0.1%
    // entry fee (0.09 USD): collateral 9.91, reserve = size / entry price,
    // guaranteed rises by size - collateral
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    let position = vault.position(ALICE, BTC, BTC, Side::Long).unwrap();
    assert_eq!(position.size.value(), dec!(90));
    assert_eq!(position.collateral.value(), dec!(9.91));
    assert_eq!(position.average_price, dec!(40000));
    assert_eq!(position.reserve_amount, dec!(0.00225));

    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.reserved_amount, dec!(0.00225));
    assert_eq!(pool.guaranteed_usd.value(), dec!(80.09));
    assert_conservation(&vault, BTC);
}

#[test]
fn long_increase_blends_entry_price() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    vault.advance_time(10_000);
    set_price(&mut vault, BTC, dec!(42000));

    vault.transfer_in(BTC, dec!(0.00025));
    vault
        .increase_position(
            &CallContext::new(ALICE),
            ALICE,
            BTC,
            BTC,
            Usd::new(dec!(90)),
            Side::Long,
        )
        .unwrap();

    let position = vault.position(ALICE, BTC, BTC, Side::Long).unwrap();
    assert_eq!(position.size.value(), dec!(180));
    // (90 * 40000 + 90 * 42000) / 180
    assert_eq!(position.average_price, dec!(41000));
}

#[test]
fn long_close_with_profit() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    vault.advance_time(10_000);
    set_price(&mut vault, BTC, dec!(44000));

    let closed = vault
        .decrease_position(
            &CallContext::new(ALICE),
            ALICE,
            BTC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(90)),
            Side::Long,
            ALICE,
        )
        .unwrap();

    // pnl = 90 * 4000 / 40000 = 9; payout = (9 + 9.91 - 0.09) / 44000
    assert!(closed.closed);
    assert_eq!(closed.realized_pnl.value(), dec!(9));
    assert_eq!(closed.amount_out, dec!(0.00042772));

    assert!(vault.position(ALICE, BTC, BTC, Side::Long).is_none());
    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.reserved_amount, Decimal::ZERO);
    assert_eq!(pool.guaranteed_usd.value(), Decimal::ZERO);
    assert_conservation(&vault, BTC);
}

#[test]
fn partial_decrease_releases_reserve_pro_rata() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    let decreased = vault
        .decrease_position(
            &CallContext::new(ALICE),
            ALICE,
            BTC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(45)),
            Side::Long,
            ALICE,
        )
        .unwrap();

    // flat price: no pnl, exit fee 0.045 comes out of collateral
    assert!(!decreased.closed);
    assert_eq!(decreased.realized_pnl.value(), Decimal::ZERO);
    assert_eq!(decreased.amount_out, Decimal::ZERO);

    let position = vault.position(ALICE, BTC, BTC, Side::Long).unwrap();
    assert_eq!(position.size.value(), dec!(45));
    assert_eq!(position.collateral.value(), dec!(9.865));
    assert_eq!(position.reserve_amount, dec!(0.001125));

    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.reserved_amount, dec!(0.001125));
    // guarantee identity: 45 - 9.865
    assert_eq!(pool.guaranteed_usd.value(), dec!(35.135));
    assert_conservation(&vault, BTC);
}

#[test]
fn decrease_keeps_liquidation_fee_buffer() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    // withdrawing 7 USD would leave 2.865, below the 5 USD liquidation fee
    let result = vault.decrease_position(
        &CallContext::new(ALICE),
        ALICE,
        BTC,
        BTC,
        Usd::new(dec!(7)),
        Usd::new(dec!(45)),
        Side::Long,
        ALICE,
    );
    assert_eq!(result, Err(VaultError::CollateralBelowLiquidationFee));

    // rejected atomically
    let position = vault.position(ALICE, BTC, BTC, Side::Long).unwrap();
    assert_eq!(position.size.value(), dec!(90));
    assert_eq!(position.collateral.value(), dec!(9.91));
    assert_conservation(&vault, BTC);
}

#[test]
fn profit_below_threshold_is_deferred() {
    let mut vault = vault_with_tokens();
    let gov = CallContext::new(GOV);
    let mut btc = TokenConfig::volatile("WBTC", 8);
    btc.redemption_weight_bps = 10_000;
    btc.min_profit_bps = 75;
    vault.set_token_config(&gov, BTC, btc).unwrap();

    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    // +50 bps: inside the 75 bps band, so the raw gain is not recognized
    vault.advance_time(10_000);
    set_price(&mut vault, BTC, dec!(40200));

    let decreased = vault
        .decrease_position(
            &CallContext::new(ALICE),
            ALICE,
            BTC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(45)),
            Side::Long,
            ALICE,
        )
        .unwrap();
    assert_eq!(decreased.realized_pnl.value(), Decimal::ZERO);
}

#[test]
fn losses_are_never_deferred() {
    let mut vault = vault_with_tokens();
    let gov = CallContext::new(GOV);
    let mut btc = TokenConfig::volatile("WBTC", 8);
    btc.redemption_weight_bps = 10_000;
    btc.min_profit_bps = 75;
    vault.set_token_config(&gov, BTC, btc).unwrap();

    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    // -50 bps: losses settle in full even inside the band
    vault.advance_time(10_000);
    set_price(&mut vault, BTC, dec!(39800));

    let decreased = vault
        .decrease_position(
            &CallContext::new(ALICE),
            ALICE,
            BTC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(45)),
            Side::Long,
            ALICE,
        )
        .unwrap();
    assert_eq!(decreased.realized_pnl.value(), dec!(-0.225));
}

#[test]
fn short_lifecycle_settles_in_stable_collateral() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, USDC, dec!(50000), ALICE);

    vault.transfer_in(USDC, dec!(100));
    vault
        .increase_position(
            &CallContext::new(ALICE),
            ALICE,
            USDC,
            BTC,
            Usd::new(dec!(500)),
            Side::Short,
        )
        .unwrap();

    let position = vault.position(ALICE, USDC, BTC, Side::Short).unwrap();
    assert_eq!(position.size.value(), dec!(500));
    assert_eq!(position.collateral.value(), dec!(99.5)); // 100 - 0.5 entry fee
    assert_eq!(position.average_price, dec!(40000));
    assert_eq!(position.reserve_amount, dec!(500)); // reserved in USDC

    let pool = vault.pool(USDC).unwrap();
    assert_eq!(pool.reserved_amount, dec!(500));
    // shorts carry no pool guarantee
    assert_eq!(pool.guaranteed_usd.value(), Decimal::ZERO);

    // BTC falls 10%: short gains 50 USD
    vault.advance_time(10_000);
    set_price(&mut vault, BTC, dec!(36000));

    let closed = vault
        .decrease_position(
            &CallContext::new(ALICE),
            ALICE,
            USDC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(500)),
            Side::Short,
            ALICE,
        )
        .unwrap();

    assert_eq!(closed.realized_pnl.value(), dec!(50));
    // (50 + 99.5 - 0.5) paid out in USDC at peg
    assert_eq!(closed.amount_out, dec!(149));

    let pool = vault.pool(USDC).unwrap();
    assert_eq!(pool.reserved_amount, Decimal::ZERO);
    assert_conservation(&vault, USDC);
}

#[test]
fn pairing_rules_are_enforced() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    issue(&mut vault, USDC, dec!(50000), ALICE);
    let ctx = CallContext::new(ALICE);

    // long with mismatched collateral/index
    vault.transfer_in(USDC, dec!(100));
    assert_eq!(
        vault.increase_position(&ctx, ALICE, USDC, BTC, Usd::new(dec!(90)), Side::Long),
        Err(VaultError::CollateralMustMatchIndex)
    );

    // short with volatile collateral
    assert_eq!(
        vault.increase_position(&ctx, ALICE, BTC, BTC, Usd::new(dec!(90)), Side::Short),
        Err(VaultError::CollateralMustBeStable)
    );

    // short on a stable index
    assert_eq!(
        vault.increase_position(&ctx, ALICE, USDC, USDC, Usd::new(dec!(90)), Side::Short),
        Err(VaultError::IndexMustNotBeStable)
    );

    // short on a non-shortable index
    let t = vault.time();
    vault.oracle_mut().submit_price(TKN, 1, dec!(300), t);
    let mut config = TokenConfig::volatile("TKN", 18);
    config.is_shortable = false;
    config.redemption_weight_bps = 10_000;
    vault
        .set_token_config(&CallContext::new(GOV), TKN, config)
        .unwrap();
    assert_eq!(
        vault.increase_position(&ctx, ALICE, USDC, TKN, Usd::new(dec!(90)), Side::Short),
        Err(VaultError::IndexNotShortable(TKN))
    );
}

#[test]
fn leverage_cap_binds_on_increase() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    // 600 USD on 10 USD of collateral minus 0.6 fee: 63.8x against a 50x cap
    vault.transfer_in(BTC, dec!(0.00025));
    let result = vault.increase_position(
        &CallContext::new(ALICE),
        ALICE,
        BTC,
        BTC,
        Usd::new(dec!(600)),
        Side::Long,
    );
    assert!(matches!(result, Err(VaultError::MaxLeverageExceeded { .. })));
    assert!(vault.position(ALICE, BTC, BTC, Side::Long).is_none());
}

#[test]
fn reserve_cannot_exceed_pool() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(0.01), ALICE); // pool 0.00997 BTC

    // 600 USD long needs 0.015 BTC reserved against ~0.0105 in the pool
    vault.transfer_in(BTC, dec!(0.0005));
    let result = vault.increase_position(
        &CallContext::new(ALICE),
        ALICE,
        BTC,
        BTC,
        Usd::new(dec!(600)),
        Side::Long,
    );
    assert_eq!(result, Err(VaultError::ReserveExceedsPool(BTC)));

    // no partial mutation: reservation and pool untouched
    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.reserved_amount, Decimal::ZERO);
    assert_eq!(pool.pool_amount, dec!(0.00997));
}

#[test]
fn fees_exceeding_deposit_reject_the_increase() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    // no collateral transferred at all: the margin fee has nothing to bite
    let result = vault.increase_position(
        &CallContext::new(ALICE),
        ALICE,
        BTC,
        BTC,
        Usd::new(dec!(90)),
        Side::Long,
    );
    assert_eq!(result, Err(VaultError::FeesExceedCollateral));
}

#[test]
fn fee_forced_liquidation_of_profitable_position() {
    // accrued funding alone can make a position liquidatable even while it
    // is nominally in profit at the current mark
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    assert_eq!(
        vault.liquidation_state(ALICE, BTC, BTC, Side::Long).unwrap(),
        LiquidationState::Solvent
    );
    assert_eq!(
        vault.liquidate_position(
            &CallContext::new(KEEPER),
            ALICE,
            BTC,
            BTC,
            Side::Long,
            KEEPER
        ),
        Err(VaultError::NotLiquidatable)
    );

    // crank the funding factor and let two days of intervals accrue
    let mut funding = FundingParams::default();
    funding.funding_rate_factor = dec!(5);
    vault
        .set_funding_rate(&CallContext::new(GOV), funding)
        .unwrap();

    vault.advance_time(8 * HOUR_MS);
    vault.update_funding(BTC).unwrap(); // anchors the interval clock
    vault.advance_time(16 * 8 * HOUR_MS);
    vault.update_funding(BTC).unwrap();

    // mark the position profitable
    set_price(&mut vault, BTC, dec!(42000));

    let state = vault.liquidation_state(ALICE, BTC, BTC, Side::Long).unwrap();
    assert!(matches!(
        state,
        LiquidationState::FeesExceedCollateral { .. }
    ));

    let outcome = vault
        .liquidate_position(
            &CallContext::new(KEEPER),
            ALICE,
            BTC,
            BTC,
            Side::Long,
            KEEPER,
        )
        .unwrap();

    // fees were capped at the collateral; nothing came back to the owner
    assert_eq!(outcome.fees_collected.value(), dec!(9.91));
    assert_eq!(outcome.returned_to_owner, Decimal::ZERO);
    assert!(outcome.liquidator_fee_tokens > Decimal::ZERO);

    assert!(vault.position(ALICE, BTC, BTC, Side::Long).is_none());
    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.reserved_amount, Decimal::ZERO);
    assert_eq!(pool.guaranteed_usd.value(), Decimal::ZERO);
    assert_conservation(&vault, BTC);
}

#[test]
fn underwater_long_is_liquidated() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    // -15%: loss 13.5 USD dwarfs the 9.91 collateral
    vault.advance_time(10_000);
    set_price(&mut vault, BTC, dec!(34000));

    // a decrease can no longer settle
    let decrease = vault.decrease_position(
        &CallContext::new(ALICE),
        ALICE,
        BTC,
        BTC,
        Usd::zero(),
        Usd::new(dec!(90)),
        Side::Long,
        ALICE,
    );
    assert_eq!(decrease, Err(VaultError::LossesExceedCollateral));

    let state = vault.liquidation_state(ALICE, BTC, BTC, Side::Long).unwrap();
    assert!(matches!(
        state,
        LiquidationState::LossesExceedCollateral { .. }
    ));

    let outcome = vault
        .liquidate_position(
            &CallContext::new(KEEPER),
            ALICE,
            BTC,
            BTC,
            Side::Long,
            KEEPER,
        )
        .unwrap();

    assert_eq!(outcome.loss.value(), dec!(13.5));
    assert_eq!(outcome.returned_to_owner, Decimal::ZERO);
    // 5 USD at 34,000
    assert_eq!(outcome.liquidator_fee_tokens, dec!(0.00014705));

    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.reserved_amount, Decimal::ZERO);
    assert_eq!(pool.guaranteed_usd.value(), Decimal::ZERO);
    assert_conservation(&vault, BTC);
}

#[test]
fn funding_accrues_with_utilization() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    vault.advance_time(8 * HOUR_MS);
    vault.update_funding(BTC).unwrap(); // anchor
    vault.advance_time(8 * HOUR_MS);
    vault.update_funding(BTC).unwrap();

    let pool = vault.pool(BTC).unwrap();
    // one interval at factor * reserved / pool
    let expected = dec!(0.0006) * pool.reserved_amount / pool.pool_amount;
    assert_eq!(pool.cumulative_funding_rate, expected);

    // idle token with nothing reserved accrues nothing
    vault.update_funding(USDC).unwrap();
    assert_eq!(
        vault.pool(USDC).unwrap().cumulative_funding_rate,
        Decimal::ZERO
    );
}

#[test]
fn router_allow_list_gates_delegated_calls() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    vault.transfer_in(BTC, dec!(0.00025));
    let bob = CallContext::new(BOB);
    assert_eq!(
        vault.increase_position(&bob, ALICE, BTC, BTC, Usd::new(dec!(90)), Side::Long),
        Err(VaultError::Unauthorized(BOB))
    );

    vault
        .add_approved_router(&CallContext::new(GOV), BOB)
        .unwrap();
    assert!(vault
        .increase_position(&bob, ALICE, BTC, BTC, Usd::new(dec!(90)), Side::Long)
        .is_ok());

    vault
        .remove_approved_router(&CallContext::new(GOV), BOB)
        .unwrap();
    assert_eq!(
        vault.decrease_position(
            &bob,
            ALICE,
            BTC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(45)),
            Side::Long,
            ALICE
        ),
        Err(VaultError::Unauthorized(BOB))
    );
}

#[test]
fn governance_surface_is_gated() {
    let mut vault = vault_with_tokens();
    let alice = CallContext::new(ALICE);

    assert_eq!(
        vault.set_fees(&alice, FeeSchedule::default()),
        Err(VaultError::Unauthorized(ALICE))
    );
    assert_eq!(
        vault.set_max_leverage(&alice, dec!(10)),
        Err(VaultError::Unauthorized(ALICE))
    );
    assert_eq!(
        vault.withdraw_fees(&alice, BTC, ALICE),
        Err(VaultError::Unauthorized(ALICE))
    );
    assert_eq!(
        vault.set_token_config(&alice, TKN, TokenConfig::volatile("TKN", 18)),
        Err(VaultError::Unauthorized(ALICE))
    );
}

#[test]
fn whitelisting_requires_a_price() {
    let mut vault = vault_with_tokens();

    // TKN has no oracle source yet
    let result = vault.set_token_config(
        &CallContext::new(GOV),
        TKN,
        TokenConfig::volatile("TKN", 18),
    );
    assert_eq!(
        result,
        Err(VaultError::Oracle(OracleError::PriceUnresolvable(TKN)))
    );
}

#[test]
fn clearing_a_token_resets_pool_state() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    vault
        .clear_token_config(&CallContext::new(GOV), BTC)
        .unwrap();

    assert!(vault.token_config(BTC).is_none());
    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.pool_amount, Decimal::ZERO);
    assert_eq!(pool.issued_debt.value(), Decimal::ZERO);

    // a delisted token is no longer accepted
    vault.transfer_in(BTC, dec!(1));
    assert_eq!(
        vault.issue_debt_unit(&CallContext::new(ALICE), BTC, ALICE),
        Err(VaultError::TokenNotWhitelisted(BTC))
    );
}

#[test]
fn fee_withdrawal_drains_reserve_and_custody() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    let withdrawn = vault
        .withdraw_fees(&CallContext::new(GOV), BTC, GOV)
        .unwrap();
    assert_eq!(withdrawn, dec!(0.003));

    let pool = vault.pool(BTC).unwrap();
    assert_eq!(pool.fee_reserve, Decimal::ZERO);
    assert_eq!(vault.custody(BTC), dec!(0.997));
    assert_conservation(&vault, BTC);
}

#[test]
fn resource_price_ceiling_rejects_expensive_calls() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    vault
        .set_max_resource_price(&CallContext::new(GOV), Some(dec!(100)))
        .unwrap();

    vault.transfer_in(BTC, dec!(0.1));
    let pricey = CallContext::with_resource_price(ALICE, dec!(150));
    assert!(matches!(
        vault.issue_debt_unit(&pricey, BTC, ALICE),
        Err(VaultError::ResourcePriceTooHigh { .. })
    ));

    let cheap = CallContext::with_resource_price(ALICE, dec!(50));
    assert!(vault.issue_debt_unit(&cheap, BTC, ALICE).is_ok());
}

#[test]
fn stale_oracle_aborts_operations() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);

    // outlive the 60s staleness window without a fresh print
    vault.advance_time(120_000);
    vault.transfer_in(BTC, dec!(0.1));
    assert_eq!(
        vault.issue_debt_unit(&CallContext::new(ALICE), BTC, ALICE),
        Err(VaultError::Oracle(OracleError::StalePrice(BTC)))
    );
}

#[test]
fn operations_emit_audit_events() {
    let mut vault = vault_with_tokens();
    issue(&mut vault, BTC, dec!(1), ALICE);
    open_reference_long(&mut vault);

    let events = vault.events();
    assert!(events
        .iter()
        .any(|e| matches!(e.payload, EventPayload::TokenConfigured(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e.payload, EventPayload::DebtIssued(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e.payload, EventPayload::PositionIncreased(_))));

    // ids are monotonically increasing
    for pair in events.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }
}

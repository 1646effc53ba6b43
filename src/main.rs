//! Collateral Vault Core Simulation.
//!
//! Walks the full ledger lifecycle: debt-unit issuance and redemption, swaps,
//! leveraged longs and shorts, funding accrual, and a liquidation.

use rust_decimal_macros::dec;
use vault_core::*;

const GOV: AccountId = AccountId(1);
const ALICE: AccountId = AccountId(2);
const BOB: AccountId = AccountId(3);
const KEEPER: AccountId = AccountId(9);

const BTC: TokenId = TokenId(1);
const USDC: TokenId = TokenId(2);

fn main() {
    println!("Collateral Vault Core Simulation");
    println!("Multi-Asset Pool, Debt-Unit Issuance, Leveraged Positions\n");

    scenario_1_issue_and_redeem();
    scenario_2_swap();
    scenario_3_long_lifecycle();
    scenario_4_funding_and_liquidation();

    println!("\nAll simulations completed successfully.");
}

// a vault with BTC and USDC whitelisted and freshly priced
fn setup() -> Vault {
    let mut vault = Vault::new(GOV, VaultConfig::default(), OracleConfig::default());
    vault.set_time(Timestamp::from_millis(1_000));

    let now = vault.time();
    vault.oracle_mut().submit_price(BTC, 1, dec!(41000), now);
    vault.oracle_mut().submit_price(USDC, 1, dec!(1), now);

    // full redemption weight so single-token issuance is never capped here;
    // the cap itself is exercised in the test suite
    let mut btc_config = TokenConfig::volatile("WBTC", 8);
    btc_config.redemption_weight_bps = 10_000;
    let mut usdc_config = TokenConfig::strict_stable("USDC", 6);
    usdc_config.redemption_weight_bps = 10_000;

    let gov_ctx = CallContext::new(GOV);
    vault.set_token_config(&gov_ctx, BTC, btc_config).unwrap();
    vault.set_token_config(&gov_ctx, USDC, usdc_config).unwrap();

    vault
}

/// Issue debt-unit against BTC collateral, then redeem part of it.
fn scenario_1_issue_and_redeem() {
    println!("Scenario 1: Debt-Unit Issuance and Redemption\n");

    let mut vault = setup();
    let ctx = CallContext::new(ALICE);

    vault.transfer_in(BTC, dec!(2));
    let issued = vault.issue_debt_unit(&ctx, BTC, ALICE).unwrap();
    println!(
        "  Alice deposits 2 BTC @ $41,000: minted {} debt-units, fee {} BTC",
        issued.minted, issued.fee_tokens
    );

    let pool = vault.pool(BTC).unwrap();
    println!(
        "  Pool: {} BTC backing, {} BTC fee reserve",
        pool.pool_amount, pool.fee_reserve
    );

    let redeemed = vault
        .redeem_debt_unit(&ctx, BTC, Usd::new(dec!(20500)), ALICE)
        .unwrap();
    println!(
        "  Alice redeems 20,500 debt-units: {} BTC out, fee {} BTC",
        redeemed.amount_out, redeemed.fee_tokens
    );
    println!(
        "  Remaining debt-unit balance: {}\n",
        vault.debt_unit_balance(ALICE)
    );
}

/// Swap BTC into USDC through the pool.
fn scenario_2_swap() {
    println!("Scenario 2: Swap\n");

    let mut vault = setup();
    let ctx = CallContext::new(ALICE);

    // seed both pools
    vault.transfer_in(BTC, dec!(1));
    vault.issue_debt_unit(&ctx, BTC, ALICE).unwrap();
    vault.transfer_in(USDC, dec!(50000));
    vault.issue_debt_unit(&ctx, USDC, ALICE).unwrap();

    vault.transfer_in(BTC, dec!(0.5));
    let swap = vault.swap(&ctx, BTC, USDC, BOB).unwrap();
    println!(
        "  Alice swaps 0.5 BTC, Bob receives {} USDC (fee {} USDC)",
        swap.amount_out, swap.fee_tokens
    );

    let btc_pool = vault.pool(BTC).unwrap();
    let usdc_pool = vault.pool(USDC).unwrap();
    println!(
        "  BTC pool: {} units, debt {}",
        btc_pool.pool_amount, btc_pool.issued_debt
    );
    println!(
        "  USDC pool: {} units, debt {}\n",
        usdc_pool.pool_amount, usdc_pool.issued_debt
    );
}

/// Open, grow, and close a leveraged long.
fn scenario_3_long_lifecycle() {
    println!("Scenario 3: Long Position Lifecycle\n");

    let mut vault = setup();
    let ctx = CallContext::new(ALICE);

    vault.transfer_in(BTC, dec!(2));
    vault.issue_debt_unit(&ctx, BTC, ALICE).unwrap();

    // 10 USD of BTC collateral for a 90 USD long
    vault.transfer_in(BTC, dec!(0.00024390));
    let opened = vault
        .increase_position(&ctx, ALICE, BTC, BTC, Usd::new(dec!(90)), Side::Long)
        .unwrap();
    println!(
        "  Alice opens a 90 USD long @ {} (fee {} USD)",
        opened.price, opened.fee
    );

    let position = vault.position(ALICE, BTC, BTC, Side::Long).unwrap();
    println!(
        "  Position: size {}, collateral {}, leverage {:.2}",
        position.size,
        position.collateral,
        position.leverage().unwrap()
    );

    // price rallies well past the min-profit band
    vault.advance_time(10_000);
    for _ in 0..3 {
        let t = vault.time();
        vault.oracle_mut().submit_price(BTC, 1, dec!(45100), t);
    }

    let closed = vault
        .decrease_position(
            &ctx,
            ALICE,
            BTC,
            BTC,
            Usd::zero(),
            Usd::new(dec!(90)),
            Side::Long,
            ALICE,
        )
        .unwrap();
    println!(
        "  Close @ {}: realized pnl {}, paid out {} BTC\n",
        closed.price, closed.realized_pnl, closed.amount_out
    );
}

/// Funding accrues against the reserved pool; fees alone can force a liquidation.
fn scenario_4_funding_and_liquidation() {
    println!("Scenario 4: Funding Accrual and Liquidation\n");

    let mut vault = setup();
    let ctx = CallContext::new(ALICE);

    vault.transfer_in(BTC, dec!(2));
    vault.issue_debt_unit(&ctx, BTC, ALICE).unwrap();

    vault.transfer_in(BTC, dec!(0.00024390));
    vault
        .increase_position(&ctx, ALICE, BTC, BTC, Usd::new(dec!(90)), Side::Long)
        .unwrap();

    // price slides; keep the oracle fresh while time passes
    for step in 1..=4 {
        vault.advance_time(8 * 3600 * 1000);
        let t = vault.time();
        vault.oracle_mut().submit_price(BTC, 1, dec!(38500), t);
        vault.update_funding(BTC).unwrap();
        let pool = vault.pool(BTC).unwrap();
        println!(
            "  +{}h: cumulative funding rate {}",
            step * 8,
            pool.cumulative_funding_rate
        );
    }

    let state = vault
        .liquidation_state(ALICE, BTC, BTC, Side::Long)
        .unwrap();
    println!("  Liquidation state: {:?}", state);

    let keeper_ctx = CallContext::new(KEEPER);
    let outcome = vault
        .liquidate_position(&keeper_ctx, ALICE, BTC, BTC, Side::Long, KEEPER)
        .unwrap();
    println!(
        "  Liquidated @ {}: loss {}, fees {}, keeper receives {} BTC",
        outcome.mark_price, outcome.loss, outcome.fees_collected, outcome.liquidator_fee_tokens
    );

    let pool = vault.pool(BTC).unwrap();
    println!(
        "  Pool after liquidation: {} BTC, reserved {}, guaranteed {}",
        pool.pool_amount, pool.reserved_amount, pool.guaranteed_usd
    );
}

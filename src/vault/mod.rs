// 9.0: the vault core. orchestrates registry, oracle, pools and positions for
// the public operations: issue/redeem debt-unit, swap, increase/decrease
// position, liquidation, plus the governance surface.
// deterministic and event-driven with no external I/O.

mod config;
mod core;
mod funding;
mod issuance;
mod liquidations;
mod positions;
mod results;

pub use config::{ConfigError, VaultConfig};
pub use core::{CallContext, Vault};
pub use liquidations::LiquidationState;
pub use results::{
    DecreaseOutcome, IncreaseOutcome, IssueOutcome, LiquidationOutcome, RedeemOutcome, SwapOutcome,
    VaultError,
};

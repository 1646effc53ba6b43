// vault-core: collateral-pooling accounting engine.
// solvency-first architecture: every operation is atomic and leaves the ledger
// valid, regardless of call ordering or adversarial price inputs.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: TokenId, AccountId, Side, Usd, Bps, Timestamp
//   2.x  token.rs: per-token configuration and the registry
//   3.x  oracle.rs: multi-source price aggregation, directional (min,max) quotes
//   4.x  fees.rs: swap/stable-swap/margin fee tables, fixed liquidation fee
//   5.x  funding.rs: utilization-proportional funding index, 8h intervals
//   6.x  ledger.rs: per-token PoolState and USD/token conversions
//   7.x  position.rs: position struct, pnl with min-profit deferral
//   8.x  events.rs: state transition events for audit
//   9.x  vault/: the core: issuance, swaps, position lifecycle, liquidation,
//        funding advance, governance surface

// ledger building blocks
pub mod events;
pub mod fees;
pub mod funding;
pub mod ledger;
pub mod oracle;
pub mod position;
pub mod token;
pub mod types;

// the orchestration core
pub mod vault;

// re exports for convenience
pub use events::*;
pub use fees::*;
pub use funding::*;
pub use ledger::*;
pub use oracle::*;
pub use position::*;
pub use token::*;
pub use types::*;
pub use vault::*;

// 9.0.2: result types and the error taxonomy for vault operations.
// every rejection is total-failure/no-side-effect; the variant is the typed
// failure reason the caller sees.

use crate::oracle::OracleError;
use crate::types::{AccountId, TokenId, Usd};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct IssueOutcome {
    pub amount_in: Decimal,
    pub fee_tokens: Decimal,
    pub minted: Usd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedeemOutcome {
    pub burned: Usd,
    pub amount_out: Decimal,
    pub fee_tokens: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapOutcome {
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee_tokens: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncreaseOutcome {
    pub price: Decimal,
    pub collateral_added: Usd,
    pub fee: Usd,
    pub reserve_delta: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecreaseOutcome {
    pub price: Decimal,
    pub realized_pnl: Usd,
    pub fee: Usd,
    pub amount_out: Decimal,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationOutcome {
    pub mark_price: Decimal,
    pub loss: Usd,
    pub fees_collected: Usd,
    pub returned_to_owner: Decimal,
    pub liquidator_fee_tokens: Decimal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VaultError {
    // configuration errors
    #[error("token {0:?} is not whitelisted")]
    TokenNotWhitelisted(TokenId),

    #[error("caller {0:?} is not authorized")]
    Unauthorized(AccountId),

    #[error("resource price {price} exceeds ceiling {ceiling}")]
    ResourcePriceTooHigh { price: Decimal, ceiling: Decimal },

    // input errors
    #[error("swap legs must differ")]
    IdenticalTokens,

    #[error("amount must be positive")]
    ZeroAmount,

    #[error("no tokens were deposited")]
    NothingDeposited,

    #[error("long collateral must match the index token")]
    CollateralMustMatchIndex,

    #[error("long collateral must not be a stable token")]
    CollateralMustNotBeStable,

    #[error("short collateral must be a stable token")]
    CollateralMustBeStable,

    #[error("short index must not be a stable token")]
    IndexMustNotBeStable,

    #[error("token {0:?} is not shortable")]
    IndexNotShortable(TokenId),

    #[error("position not found")]
    PositionNotFound,

    #[error("size delta exceeds position size")]
    SizeExceedsPosition,

    #[error("collateral delta exceeds position collateral")]
    CollateralUnderflow,

    // solvency errors
    #[error("reserve exceeds pool for token {0:?}")]
    ReserveExceedsPool(TokenId),

    #[error("max debt exceeded for token {0:?}")]
    MaxDebtExceeded(TokenId),

    #[error("pool amount insufficient for token {0:?}")]
    InsufficientPool(TokenId),

    #[error("insufficient debt-unit balance: requested {requested}, available {available}")]
    InsufficientDebtUnits { requested: Usd, available: Usd },

    #[error("issued debt underflow for token {0:?}")]
    DebtUnderflow(TokenId),

    #[error("fees exceed deposited collateral")]
    FeesExceedCollateral,

    #[error("losses exceed collateral")]
    LossesExceedCollateral,

    #[error("remaining collateral cannot cover the liquidation fee")]
    CollateralBelowLiquidationFee,

    #[error("leverage {leverage} exceeds maximum {max}")]
    MaxLeverageExceeded { leverage: Decimal, max: Decimal },

    #[error("position size must exceed collateral")]
    SizeBelowCollateral,

    #[error("position is not liquidatable")]
    NotLiquidatable,

    // oracle errors
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

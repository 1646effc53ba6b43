// 8.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists
// all event types.

use crate::types::{AccountId, Side, Timestamp, TokenId, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Ledger events
    DebtIssued(DebtIssuedEvent),
    DebtRedeemed(DebtRedeemedEvent),
    Swapped(SwapEvent),

    // Position events
    PositionIncreased(PositionIncreasedEvent),
    PositionDecreased(PositionDecreasedEvent),
    PositionClosed(PositionClosedEvent),
    PositionLiquidated(PositionLiquidatedEvent),

    // Accrual events
    FundingUpdated(FundingUpdatedEvent),

    // Governance events
    FeesWithdrawn(FeesWithdrawnEvent),
    TokenConfigured(TokenConfiguredEvent),
    TokenCleared(TokenClearedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtIssuedEvent {
    pub token: TokenId,
    pub receiver: AccountId,
    pub amount_in: Decimal,
    pub fee_tokens: Decimal,
    pub minted: Usd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtRedeemedEvent {
    pub token: TokenId,
    pub receiver: AccountId,
    pub burned: Usd,
    pub amount_out: Decimal,
    pub fee_tokens: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEvent {
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub receiver: AccountId,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee_tokens: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionIncreasedEvent {
    pub owner: AccountId,
    pub collateral_token: TokenId,
    pub index_token: TokenId,
    pub side: Side,
    pub size_delta: Usd,
    pub collateral_delta: Usd,
    pub price: Decimal,
    pub fee: Usd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDecreasedEvent {
    pub owner: AccountId,
    pub collateral_token: TokenId,
    pub index_token: TokenId,
    pub side: Side,
    pub size_delta: Usd,
    pub collateral_delta: Usd,
    pub price: Decimal,
    pub fee: Usd,
    pub realized_pnl: Usd,
    pub receiver: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub owner: AccountId,
    pub collateral_token: TokenId,
    pub index_token: TokenId,
    pub side: Side,
    pub size: Usd,
    pub exit_price: Decimal,
    pub realized_pnl: Usd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub owner: AccountId,
    pub collateral_token: TokenId,
    pub index_token: TokenId,
    pub side: Side,
    pub size: Usd,
    pub collateral: Usd,
    pub mark_price: Decimal,
    pub fee_receiver: AccountId,
    pub returned_to_owner: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingUpdatedEvent {
    pub token: TokenId,
    pub accrued: Decimal,
    pub cumulative_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesWithdrawnEvent {
    pub token: TokenId,
    pub receiver: AccountId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfiguredEvent {
    pub token: TokenId,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClearedEvent {
    pub token: TokenId,
}

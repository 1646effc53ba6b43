// 2.0: per-token configuration and the registry that owns it. leaf dependency
// for everything else: pools, the oracle clamp, pairing rules and the debt cap
// all read from here.

use crate::types::TokenId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// 2.1: static/mutable configuration for one collateral or index token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    // Human readable symbol (e.g. "WBTC")
    pub symbol: String,
    // Native precision of the token's integer representation
    pub decimals: u32,
    // Whether the vault accepts this token at all
    pub is_whitelisted: bool,
    // Stable tokens qualify as short collateral and for the cheaper swap fee
    pub is_stable: bool,
    // Strict-stable tokens clamp their oracle quote to the peg
    pub is_strict_stable: bool,
    // Whether leveraged shorts may use this token as index
    pub is_shortable: bool,
    // Cap on debt-unit issuance, in bps of total pool value
    pub redemption_weight_bps: u32,
    // Minimum relative price move before profit is recognized on a decrease
    pub min_profit_bps: u32,
}

impl TokenConfig {
    // a volatile, shortable asset (the typical long/short index token)
    pub fn volatile(symbol: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            is_whitelisted: true,
            is_stable: false,
            is_strict_stable: false,
            is_shortable: true,
            redemption_weight_bps: 9000,
            min_profit_bps: 0,
        }
    }

    // a stable asset usable as short collateral
    pub fn stable(symbol: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            is_whitelisted: true,
            is_stable: true,
            is_strict_stable: false,
            is_shortable: false,
            redemption_weight_bps: 9000,
            min_profit_bps: 0,
        }
    }

    // a stable asset expected to hold its peg exactly
    pub fn strict_stable(symbol: &str, decimals: u32) -> Self {
        let mut config = Self::stable(symbol, decimals);
        config.is_strict_stable = true;
        config
    }
}

// 2.2: the registry. mutated only through the vault's governance surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRegistry {
    tokens: HashMap<TokenId, TokenConfig>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, token: TokenId, config: TokenConfig) {
        self.tokens.insert(token, config);
    }

    pub fn clear(&mut self, token: TokenId) -> Option<TokenConfig> {
        self.tokens.remove(&token)
    }

    pub fn get(&self, token: TokenId) -> Option<&TokenConfig> {
        self.tokens.get(&token)
    }

    pub fn whitelisted(&self, token: TokenId) -> Option<&TokenConfig> {
        self.tokens.get(&token).filter(|c| c.is_whitelisted)
    }

    pub fn iter_whitelisted(&self) -> impl Iterator<Item = (TokenId, &TokenConfig)> {
        self.tokens
            .iter()
            .filter(|(_, c)| c.is_whitelisted)
            .map(|(id, c)| (*id, c))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

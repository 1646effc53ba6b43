// 3.0: price aggregation. every token has one or more registered sources and
// each source keeps its last N observations (the "sample space"). quote() answers
// the maximum or minimum across everything retained, so the vault always prices
// a transaction against the worst case for itself.
//
// the engine is agnostic to where samples come from (Pyth, Chainlink, a CEX
// aggregator); the host pushes them in through submit_price.

use crate::types::{Timestamp, TokenId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

pub type SourceId = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: Decimal,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    // Observations retained per source. min/max is taken across all of them.
    pub sample_space: usize,
    // A source whose latest sample is older than this fails the whole quote.
    pub max_staleness_ms: i64,
    // Absolute deviation from 1.0 within which a strict-stable quote clamps to peg.
    pub max_strict_price_deviation: Decimal,
    // Relative window within which the primary answer is accepted over the
    // secondary source. outside it the conservative extreme of the two wins.
    pub secondary_deviation: Decimal,
    // Whether the secondary source participates at all.
    pub use_secondary: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            sample_space: 3,
            max_staleness_ms: 60_000,
            max_strict_price_deviation: Decimal::new(1, 2), // 1 cent
            secondary_deviation: Decimal::new(2, 2),        // 2%
            use_secondary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("no price source registered for token {0:?}")]
    PriceUnresolvable(TokenId),

    #[error("all samples stale for token {0:?}")]
    StalePrice(TokenId),

    #[error("zero or negative price for token {0:?}")]
    ZeroPrice(TokenId),
}

// 3.1: the aggregator. pure data, no I/O. the host submits samples and the
// vault reads directional quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOracle {
    config: OracleConfig,
    // token -> (source, retained samples newest-last)
    feeds: HashMap<TokenId, Vec<(SourceId, VecDeque<PriceSample>)>>,
    // optional reserve-ratio-derived secondary quote per token
    secondary: HashMap<TokenId, Decimal>,
}

impl PriceOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            feeds: HashMap::new(),
            secondary: HashMap::new(),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn set_sample_space(&mut self, sample_space: usize) {
        self.config.sample_space = sample_space.max(1);
        for sources in self.feeds.values_mut() {
            for (_, history) in sources.iter_mut() {
                while history.len() > self.config.sample_space {
                    history.pop_front();
                }
            }
        }
    }

    pub fn add_source(&mut self, token: TokenId, source: SourceId) {
        let sources = self.feeds.entry(token).or_default();
        if !sources.iter().any(|(id, _)| *id == source) {
            sources.push((source, VecDeque::new()));
        }
    }

    pub fn remove_source(&mut self, token: TokenId, source: SourceId) {
        if let Some(sources) = self.feeds.get_mut(&token) {
            sources.retain(|(id, _)| *id != source);
        }
    }

    // 3.2: push one observation. creates the source on first submit.
    pub fn submit_price(
        &mut self,
        token: TokenId,
        source: SourceId,
        price: Decimal,
        timestamp: Timestamp,
    ) {
        let sample_space = self.config.sample_space;
        let sources = self.feeds.entry(token).or_default();

        let idx = match sources.iter().position(|(id, _)| *id == source) {
            Some(idx) => idx,
            None => {
                sources.push((source, VecDeque::new()));
                sources.len() - 1
            }
        };

        let history = &mut sources[idx].1;
        history.push_back(PriceSample { price, timestamp });
        while history.len() > sample_space {
            history.pop_front();
        }
    }

    pub fn submit_secondary_price(&mut self, token: TokenId, price: Decimal) {
        self.secondary.insert(token, price);
    }

    pub fn has_price(&self, token: TokenId, now: Timestamp) -> bool {
        self.quote(token, false, false, now).is_ok()
    }

    // 3.3: the directional quote. want_max picks the bound that values the
    // caller's deposit lowest or their debt highest.
    pub fn quote(
        &self,
        token: TokenId,
        want_max: bool,
        strict_stable: bool,
        now: Timestamp,
    ) -> Result<Decimal, OracleError> {
        let sources = self
            .feeds
            .get(&token)
            .ok_or(OracleError::PriceUnresolvable(token))?;

        let mut best: Option<Decimal> = None;
        let mut saw_sample = false;

        for (_, history) in sources {
            let Some(latest) = history.back() else {
                continue;
            };
            saw_sample = true;

            // a stale source is a hard failure, never silently skipped
            if now.as_millis() - latest.timestamp.as_millis() > self.config.max_staleness_ms {
                return Err(OracleError::StalePrice(token));
            }

            for sample in history {
                best = Some(match best {
                    None => sample.price,
                    Some(current) if want_max => current.max(sample.price),
                    Some(current) => current.min(sample.price),
                });
            }
        }

        if !saw_sample {
            return Err(OracleError::PriceUnresolvable(token));
        }

        let mut price = best.unwrap_or(Decimal::ZERO);
        if price <= Decimal::ZERO {
            return Err(OracleError::ZeroPrice(token));
        }

        if self.config.use_secondary {
            if let Some(secondary) = self.secondary.get(&token).copied() {
                price = self.bound_against_secondary(price, secondary, want_max);
            }
        }

        if strict_stable {
            price = self.clamp_strict_stable(price, want_max);
        }

        if price <= Decimal::ZERO {
            return Err(OracleError::ZeroPrice(token));
        }

        Ok(price)
    }

    // within the deviation window the primary stands; outside it the
    // conservative extreme of the pair is taken
    fn bound_against_secondary(&self, primary: Decimal, secondary: Decimal, want_max: bool) -> Decimal {
        if secondary <= Decimal::ZERO {
            return primary;
        }
        let deviation = (primary - secondary).abs() / secondary;
        if deviation <= self.config.secondary_deviation {
            return primary;
        }
        if want_max {
            primary.max(secondary)
        } else {
            primary.min(secondary)
        }
    }

    // pegged tokens quote exactly 1 unless they have drifted past the cap,
    // and even then only on the side that is conservative for the vault
    fn clamp_strict_stable(&self, price: Decimal, want_max: bool) -> Decimal {
        let delta = (price - Decimal::ONE).abs();
        if delta <= self.config.max_strict_price_deviation {
            return Decimal::ONE;
        }
        if want_max && price > Decimal::ONE {
            return price;
        }
        if !want_max && price < Decimal::ONE {
            return price;
        }
        Decimal::ONE
    }
}

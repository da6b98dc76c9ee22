//! Withdrawal chain metadata observed on exchanges.

use crate::Market;
use serde::{Deserialize, Serialize};

/// One (exchange, symbol, chain) withdrawal observation.
///
/// Raw facts are appended per scan cycle. A fact is promoted to the curated
/// set only when the same (symbol, chain) pair shows up on at least two
/// distinct exchanges in one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainFact {
    pub exchange: Market,
    pub symbol: String,
    /// Network name as reported by the exchange (e.g. `ERC20`, `TRC20`).
    pub chain: String,
    #[serde(default)]
    pub withdraw_min: f64,
    #[serde(default)]
    pub withdraw_max: f64,
    #[serde(default)]
    pub withdraw_fee: f64,
}

impl ChainFact {
    /// Create a fact with zero limits and fee.
    pub fn new(exchange: Market, symbol: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            chain: chain.into(),
            withdraw_min: 0.0,
            withdraw_max: 0.0,
            withdraw_fee: 0.0,
        }
    }

    pub fn with_limits(mut self, min: f64, max: f64, fee: f64) -> Self {
        self.withdraw_min = min;
        self.withdraw_max = max;
        self.withdraw_fee = fee;
        self
    }
}

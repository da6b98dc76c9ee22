//! Exchange identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when an exchange name is not in the supported catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown market: {0}")]
pub struct UnknownMarket(pub String);

/// Centralized exchange supported by the chain scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Bybit,
    Kukoin,
    Htx,
    Mexc,
    Bingx,
    Ascendex,
    Bitget,
    Xt,
    Bitmart,
}

impl Market {
    /// Canonical upper-case name, as stored and as sent by the market-data service.
    pub fn as_str(self) -> &'static str {
        match self {
            Market::Bybit => "BYBIT",
            Market::Kukoin => "KUKOIN",
            Market::Htx => "HTX",
            Market::Mexc => "MEXC",
            Market::Bingx => "BINGX",
            Market::Ascendex => "ASCENDEX",
            Market::Bitget => "BITGET",
            Market::Xt => "XT",
            Market::Bitmart => "BITMART",
        }
    }

    /// Get all market variants.
    pub fn all() -> &'static [Market] {
        &[
            Market::Bybit,
            Market::Kukoin,
            Market::Htx,
            Market::Mexc,
            Market::Bingx,
            Market::Ascendex,
            Market::Bitget,
            Market::Xt,
            Market::Bitmart,
        ]
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = UnknownMarket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Market::all()
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMarket(s.to_string()))
    }
}

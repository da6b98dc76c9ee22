//! Order-book slots kept per (exchange, symbol).

use crate::Market;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderLevel {
    pub price: f64,
    #[serde(alias = "qty")]
    pub quantity: f64,
}

impl OrderLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

impl fmt::Display for OrderLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.price, self.quantity)
    }
}

/// Order-book snapshot for one (exchange, symbol) slot.
///
/// Slots exist for every pair referenced by curated chain facts; prices are
/// filled in separately and may be empty until the first refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookFact {
    pub exchange: Market,
    pub symbol: String,
    #[serde(default)]
    pub asks: Vec<OrderLevel>,
    #[serde(default)]
    pub bids: Vec<OrderLevel>,
}

/// Render levels as `[price/qty price/qty ...]` for chat messages.
pub fn format_levels(levels: &[OrderLevel]) -> String {
    let inner: Vec<String> = levels.iter().map(ToString::to_string).collect();
    format!("[{}]", inner.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_accepts_qty_alias() {
        let level: OrderLevel = serde_json::from_str(r#"{"price": 1.5, "qty": 2.0}"#).unwrap();
        assert_eq!(level, OrderLevel::new(1.5, 2.0));
    }

    #[test]
    fn test_slot_without_prices_decodes_empty() {
        let slot: OrderBookFact = serde_json::from_str(r#"{"exchange":"MEXC","symbol":"SOL"}"#).unwrap();
        assert_eq!(slot.exchange, Market::Mexc);
        assert!(slot.asks.is_empty());
        assert!(slot.bids.is_empty());
    }

    #[test]
    fn test_format_levels() {
        let levels = vec![OrderLevel::new(100.0, 0.5), OrderLevel::new(101.0, 1.0)];
        assert_eq!(format_levels(&levels), "[100/0.5 101/1]");
        assert_eq!(format_levels(&[]), "[]");
    }
}

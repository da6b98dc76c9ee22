//! Wire format of the market-data service.
//!
//! Older service builds use different field spellings and send order counts
//! as floats and order-book slices as a bare number; both shapes decode.

use serde::de::IgnoredAny;
use serde::Deserialize;
use spread_core::{OrderLevel, SessionId, TransactionFact};

/// Order-book slice as sent on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LevelsField {
    Levels(Vec<OrderLevel>),
    /// Legacy builds send a single aggregate number instead of levels; any
    /// value that is not a level list decodes as an empty slice.
    Other(IgnoredAny),
}

impl Default for LevelsField {
    fn default() -> Self {
        LevelsField::Levels(Vec::new())
    }
}

impl LevelsField {
    fn into_levels(self) -> Vec<OrderLevel> {
        match self {
            LevelsField::Levels(levels) => levels,
            LevelsField::Other(_) => Vec::new(),
        }
    }
}

/// One opportunity record from `GET {endpoint}?usdt=..`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotDeal {
    pub symbol: String,
    #[serde(default)]
    pub chain: String,
    pub market_from: String,
    pub market_to: String,
    #[serde(default)]
    pub spread: f64,
    #[serde(default, alias = "with_draw_fee")]
    pub withdraw_fee: f64,
    #[serde(default)]
    pub withdraw_max: f64,
    #[serde(default, alias = "amount_coin")]
    pub coin_amount: f64,
    #[serde(default, alias = "amount_ask_order")]
    pub ask_order_count: f64,
    #[serde(default)]
    pub ask_cost: f64,
    #[serde(default, alias = "ask_order")]
    ask_orders: LevelsField,
    #[serde(default, alias = "amount_bid_order")]
    pub bid_order_count: f64,
    #[serde(default)]
    pub bid_cost: f64,
    #[serde(default, alias = "bid_order")]
    bid_orders: LevelsField,
}

fn order_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

impl SpotDeal {
    /// Convert to a transaction fact. The session is stamped later by the
    /// reconciliation engine.
    pub fn into_fact(self) -> TransactionFact {
        TransactionFact {
            session_id: SessionId(0),
            symbol: self.symbol,
            chain: self.chain,
            market_from: self.market_from,
            market_to: self.market_to,
            spread: self.spread,
            withdraw_fee: self.withdraw_fee,
            withdraw_max: self.withdraw_max,
            coin_amount: self.coin_amount,
            ask_order_count: order_count(self.ask_order_count),
            ask_cost: self.ask_cost,
            ask_orders: self.ask_orders.into_levels(),
            bid_order_count: order_count(self.bid_order_count),
            bid_cost: self.bid_cost,
            bid_orders: self.bid_orders.into_levels(),
            delivered: false,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_current_format() {
        let json = r#"{
            "symbol": "TRX",
            "chain": "TRC20",
            "market_from": "BYBIT",
            "market_to": "MEXC",
            "spread": 0.72,
            "withdraw_fee": 1.0,
            "withdraw_max": 50000,
            "coin_amount": 812.4,
            "ask_order_count": 2,
            "ask_cost": 100.0,
            "ask_orders": [{"price": 0.1231, "quantity": 500}, {"price": 0.1232, "quantity": 312.4}],
            "bid_order_count": 1,
            "bid_cost": 100.72,
            "bid_orders": [{"price": 0.124, "quantity": 812.4}]
        }"#;

        let fact = serde_json::from_str::<SpotDeal>(json).unwrap().into_fact();
        assert_eq!(fact.symbol, "TRX");
        assert_eq!(fact.ask_order_count, 2);
        assert_eq!(fact.ask_orders[1], OrderLevel::new(0.1232, 312.4));
        assert_eq!(fact.bid_orders.len(), 1);
        assert!(!fact.delivered);
    }

    #[test]
    fn test_decode_legacy_spellings() {
        let json = r#"{
            "id": 4,
            "symbol": "XRP",
            "chain": "XRP",
            "market_from": "HTX",
            "market_to": "XT",
            "spread": 1.1,
            "with_draw_fee": 0.25,
            "withdraw_max": 1000,
            "amount_coin": 190.5,
            "amount_ask_order": 3.0,
            "ask_cost": 100.0,
            "ask_order": 0.52,
            "amount_bid_order": 1.0,
            "bid_cost": 101.1,
            "bid_order": [{"price": 0.531, "qty": 190.5}]
        }"#;

        let fact = serde_json::from_str::<SpotDeal>(json).unwrap().into_fact();
        assert_eq!(fact.withdraw_fee, 0.25);
        assert_eq!(fact.coin_amount, 190.5);
        assert_eq!(fact.ask_order_count, 3);
        assert!(fact.ask_orders.is_empty());
        assert_eq!(fact.bid_orders, vec![OrderLevel::new(0.531, 190.5)]);
    }

    #[test]
    fn test_order_count_rejects_garbage() {
        assert_eq!(order_count(-1.0), 0);
        assert_eq!(order_count(f64::NAN), 0);
        assert_eq!(order_count(2.6), 3);
    }
}

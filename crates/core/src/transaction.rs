//! Detected transfer opportunities and their routing keys.

use crate::{format_levels, OrderLevel, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A concrete opportunity reported to one session: buy `symbol` on
/// `market_from`, withdraw over `chain`, sell on `market_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFact {
    pub session_id: SessionId,
    pub symbol: String,
    pub chain: String,
    pub market_from: String,
    pub market_to: String,
    /// Spread in percent.
    pub spread: f64,
    pub withdraw_fee: f64,
    pub withdraw_max: f64,
    /// Coins bought for the session budget.
    pub coin_amount: f64,
    pub ask_order_count: u32,
    pub ask_cost: f64,
    pub ask_orders: Vec<OrderLevel>,
    pub bid_order_count: u32,
    pub bid_cost: f64,
    pub bid_orders: Vec<OrderLevel>,
    /// Set once the opportunity has been sent to the chat.
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransactionFact {
    /// Routing data carried by the chat button of this opportunity.
    pub fn route(&self) -> RouteKey {
        RouteKey {
            market_from: self.market_from.clone(),
            market_to: self.market_to.clone(),
            symbol: self.symbol.clone(),
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Full multi-line description used for detail requests.
    pub fn detail_text(&self) -> String {
        let mut msg = format!("{}\n", self.symbol);
        msg.push_str(&format!("📕|{}|\n", self.market_from));
        msg.push_str(&format!("Withdraw fee: {} {}\n", self.withdraw_fee, self.symbol));
        msg.push_str(&format!("Withdraw limit: {} {}\n", self.withdraw_max, self.symbol));
        msg.push_str(&format!("Chain: {}\n", self.chain));
        msg.push_str(&format!("Amount: {:.4} {}\n", self.coin_amount, self.symbol));
        msg.push_str(&format!("Orders: {}\n", self.ask_order_count));
        msg.push_str(&format!("Cost: {:.2} USDT\n", self.ask_cost));
        msg.push_str(&format!("Orders (price/qty): {}\n", format_levels(&self.ask_orders)));
        msg.push_str(&format!("📗|{}|\n", self.market_to));
        msg.push_str(&format!("Orders: {}\n", self.bid_order_count));
        msg.push_str(&format!("Revenue: {:.2} USDT\n", self.bid_cost));
        msg.push_str(&format!("Orders (price/qty): {}\n", format_levels(&self.bid_orders)));
        msg.push_str("---\n");
        msg.push_str(&format!("💰 Spread: {:.2} %", self.spread));
        msg
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed route key: {0:?}")]
pub struct MalformedRoute(pub String);

/// Callback payload of an opportunity button, encoded as `from/to/symbol`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub market_from: String,
    pub market_to: String,
    pub symbol: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.market_from, self.market_to, self.symbol)
    }
}

impl FromStr for RouteKey {
    type Err = MalformedRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [from, to, symbol] if !from.is_empty() && !to.is_empty() && !symbol.is_empty() => {
                Ok(RouteKey {
                    market_from: (*from).to_string(),
                    market_to: (*to).to_string(),
                    symbol: (*symbol).to_string(),
                })
            }
            _ => Err(MalformedRoute(s.to_string())),
        }
    }
}

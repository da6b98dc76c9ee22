//! User session identifiers and scan parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier that owns a scanning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of a scan request sent to the market-data service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Budget in USDT.
    pub usdt: u64,
    /// Minimum spread in percent.
    pub spread_min: f64,
    /// Maximum spread in percent. `None` for the legacy single-spread query.
    pub spread_max: Option<f64>,
}

impl ScanParams {
    pub fn range(usdt: u64, spread_min: f64, spread_max: f64) -> Self {
        Self {
            usdt,
            spread_min,
            spread_max: Some(spread_max),
        }
    }

    pub fn legacy(usdt: u64, spread: f64) -> Self {
        Self {
            usdt,
            spread_min: spread,
            spread_max: None,
        }
    }

    /// Query-string pairs for the market-data endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("usdt", self.usdt.to_string())];
        match self.spread_max {
            Some(max) => {
                pairs.push(("spread_min", self.spread_min.to_string()));
                pairs.push(("spread_max", max.to_string()));
            }
            None => pairs.push(("spread", self.spread_min.to_string())),
        }
        pairs
    }
}

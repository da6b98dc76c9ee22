//! Error types for market-data requests.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching opportunities.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Market-data service returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse response: {0}")]
    Malformed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Malformed(err.to_string())
    }
}

impl FeedError {
    /// Returns true if the next poll may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Http(_) | FeedError::Timeout(_) => true,
            FeedError::Status(code) => *code >= 500 || *code == 429,
            FeedError::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FeedError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(FeedError::Status(503).is_transient());
        assert!(FeedError::Status(429).is_transient());
        assert!(!FeedError::Status(404).is_transient());
        assert!(!FeedError::Malformed("eof".to_string()).is_transient());
    }

    #[test]
    fn test_json_error_maps_to_malformed() {
        let err: FeedError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(matches!(err, FeedError::Malformed(_)));
    }
}

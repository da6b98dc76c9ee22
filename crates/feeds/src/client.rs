//! HTTP client for the spot opportunity endpoint.

use crate::wire::SpotDeal;
use crate::FeedError;
use async_trait::async_trait;
use spread_core::{ScanParams, TransactionFact};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of spread opportunities for one set of scan parameters.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, params: &ScanParams) -> Result<Vec<TransactionFact>, FeedError>;
}

/// reqwest-backed client for `GET {endpoint}?usdt=..&spread_min=..&spread_max=..`.
#[derive(Clone)]
pub struct SpotClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SpotClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Pick the local endpoint if it answers at all, otherwise the remote one.
    pub async fn discover(
        local: &str,
        remote: &str,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let mut client = Self::new(local, timeout)?;

        match client.http.get(local).send().await {
            Ok(response) => {
                info!(endpoint = local, status = %response.status(), "Using local market-data endpoint");
            }
            Err(e) => {
                warn!(endpoint = local, error = %e, "Local market-data endpoint unreachable, using remote");
                client.endpoint = remote.to_string();
            }
        }

        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MarketDataSource for SpotClient {
    async fn fetch(&self, params: &ScanParams) -> Result<Vec<TransactionFact>, FeedError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout(self.timeout)
                } else {
                    FeedError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let deals: Vec<SpotDeal> = serde_json::from_slice(&body)?;
        debug!(count = deals.len(), usdt = params.usdt, "Fetched opportunities");

        Ok(deals.into_iter().map(SpotDeal::into_fact).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn deal_json(symbol: &str) -> serde_json::Value {
        serde_json::json!({
            "symbol": symbol,
            "chain": "TRC20",
            "market_from": "BYBIT",
            "market_to": "MEXC",
            "spread": 0.5,
            "withdraw_fee": 1.0,
            "withdraw_max": 1000.0,
            "coin_amount": 99.0,
            "ask_order_count": 1,
            "ask_cost": 100.0,
            "ask_orders": [{"price": 1.01, "quantity": 99.0}],
            "bid_order_count": 1,
            "bid_cost": 100.5,
            "bid_orders": [{"price": 1.015, "quantity": 99.0}]
        })
    }

    #[tokio::test]
    async fn test_fetch_range_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/spot"))
            .and(query_param("usdt", "100"))
            .and(query_param("spread_min", "0.3"))
            .and(query_param("spread_max", "0.8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([deal_json("TRX"), deal_json("XRP")])),
            )
            .mount(&mock_server)
            .await;

        let client =
            SpotClient::new(format!("{}/spot", mock_server.uri()), Duration::from_secs(5)).unwrap();
        let facts = client.fetch(&ScanParams::range(100, 0.3, 0.8)).await.unwrap();

        let symbols: Vec<_> = facts.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TRX", "XRP"]);
        assert_eq!(facts[0].ask_orders.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_legacy_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/spot"))
            .and(query_param("usdt", "250"))
            .and(query_param("spread", "1.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let client =
            SpotClient::new(format!("{}/spot", mock_server.uri()), Duration::from_secs(5)).unwrap();
        let facts = client.fetch(&ScanParams::legacy(250, 1.5)).await.unwrap();
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let client = SpotClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.fetch(&ScanParams::range(100, 0.3, 0.8)).await.unwrap_err();
        assert!(matches!(err, FeedError::Status(502)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = SpotClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.fetch(&ScanParams::range(100, 0.3, 0.8)).await.unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = SpotClient::new(mock_server.uri(), Duration::from_millis(50)).unwrap();
        let err = client.fetch(&ScanParams::range(100, 0.3, 0.8)).await.unwrap_err();
        assert!(matches!(err, FeedError::Timeout(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_discover_prefers_reachable_local() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&mock_server)
            .await;

        let local = format!("{}/spot", mock_server.uri());
        let client = SpotClient::discover(&local, "http://remote.invalid/spot", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(client.endpoint(), local);
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_remote() {
        // Nothing listens on port 9 of localhost.
        let client = SpotClient::discover(
            "http://127.0.0.1:9/spot",
            "http://remote.example/spot",
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(client.endpoint(), "http://remote.example/spot");
    }
}

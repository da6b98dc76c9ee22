//! In-process fakes shared by the session and bot tests.

use crate::transport::{ChatTransport, Choice, TransportError};
use async_trait::async_trait;
use spread_core::{OrderLevel, ScanParams, SessionId, TransactionFact};
use spread_feeds::{FeedError, MarketDataSource};
use spread_warehouse::{ReconciliationEngine, SqliteWarehouse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn deal(symbol: &str, spread: f64) -> TransactionFact {
    TransactionFact {
        session_id: SessionId(0),
        symbol: symbol.to_string(),
        chain: "TRC20".to_string(),
        market_from: "BYBIT".to_string(),
        market_to: "MEXC".to_string(),
        spread,
        withdraw_fee: 1.0,
        withdraw_max: 1000.0,
        coin_amount: 99.0,
        ask_order_count: 1,
        ask_cost: 100.0,
        ask_orders: vec![OrderLevel::new(1.01, 99.0)],
        bid_order_count: 1,
        bid_cost: 100.0 + spread,
        bid_orders: vec![OrderLevel::new(1.02, 99.0)],
        delivered: false,
        updated_at: None,
    }
}

pub async fn memory_engine() -> ReconciliationEngine {
    let store = SqliteWarehouse::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory store");
    ReconciliationEngine::new(Arc::new(store))
}

/// Market-data source returning a fixed answer.
pub struct FakeSource {
    response: Mutex<Result<Vec<TransactionFact>, u16>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn returning(deals: Vec<TransactionFact>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(deals)),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(status)),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(Vec::new())),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_deals(&self, deals: Vec<TransactionFact>) {
        *self.response.lock().unwrap() = Ok(deals);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for FakeSource {
    async fn fetch(&self, _params: &ScanParams) -> Result<Vec<TransactionFact>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.response.lock().unwrap().clone();
        response.map_err(FeedError::Status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(SessionId, String),
    Choices(SessionId, Vec<Choice>),
}

/// Transport that records everything it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(_, text) => Some(text),
                Sent::Choices(..) => None,
            })
            .collect()
    }

    pub fn choice_batches(&self) -> Vec<Vec<Choice>> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Choices(_, choices) => Some(choices),
                Sent::Text(..) => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat: SessionId, text: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Text(chat, text.to_string()));
        Ok(())
    }

    async fn send_choices(
        &self,
        chat: SessionId,
        _prompt: &str,
        choices: &[Choice],
    ) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Choices(chat, choices.to_vec()));
        Ok(())
    }
}

//! Storage interface shared by every warehouse consumer.

use crate::WarehouseError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spread_core::{
    ChainFact, Market, OrderBookFact, OrderLevel, RouteKey, ScanParams, SessionId,
    TransactionFact,
};

/// Persisted description of an active scanning session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub params: ScanParams,
    pub created_at: DateTime<Utc>,
}

/// Transactional store with raw and curated relations.
///
/// Every method is one logical operation and runs in its own transaction;
/// no transaction is held open across calls.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Truncate the raw chain staging area and insert `batch` into it.
    async fn replace_raw_chains(&self, batch: &[ChainFact]) -> Result<(), WarehouseError>;

    /// Promote corroborated raw chain facts into the curated set.
    /// Does nothing when the staging area is empty.
    async fn promote_chains(&self) -> Result<(), WarehouseError>;

    async fn curated_chains(&self) -> Result<Vec<ChainFact>, WarehouseError>;

    /// Align order-book slots with the curated chain set.
    async fn sync_order_slots(&self) -> Result<(), WarehouseError>;

    /// Store fresh price levels for an existing slot.
    /// Returns false when the slot no longer exists.
    async fn update_order_prices(
        &self,
        exchange: Market,
        symbol: &str,
        asks: &[OrderLevel],
        bids: &[OrderLevel],
    ) -> Result<bool, WarehouseError>;

    async fn order_books(&self) -> Result<Vec<OrderBookFact>, WarehouseError>;

    /// Symbols with an order-book slot on `exchange`.
    async fn symbols_for(&self, exchange: Market) -> Result<Vec<String>, WarehouseError>;

    /// Stage `batch` for `session`, mirror it into the curated set and
    /// return (then mark delivered) every curated fact not yet delivered.
    async fn reconcile_transactions(
        &self,
        session: SessionId,
        batch: &[TransactionFact],
    ) -> Result<Vec<TransactionFact>, WarehouseError>;

    /// All curated facts of a session, highest spread first.
    async fn transactions(&self, session: SessionId)
        -> Result<Vec<TransactionFact>, WarehouseError>;

    async fn find_transaction(
        &self,
        session: SessionId,
        route: &RouteKey,
    ) -> Result<Option<TransactionFact>, WarehouseError>;

    async fn clear_raw_transactions(&self) -> Result<u64, WarehouseError>;

    async fn clear_curated_transactions(&self) -> Result<u64, WarehouseError>;

    async fn create_session(&self, record: &SessionRecord) -> Result<(), WarehouseError>;

    /// Remove a session together with its raw and curated transactions.
    async fn delete_session(&self, session: SessionId) -> Result<(), WarehouseError>;

    async fn sessions(&self) -> Result<Vec<SessionRecord>, WarehouseError>;

    async fn clear_sessions(&self) -> Result<u64, WarehouseError>;

    async fn close(&self);
}

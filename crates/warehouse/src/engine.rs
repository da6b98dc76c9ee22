//! Raw → curated reconciliation rules.
//!
//! The engine is the only writer of curated state. Chain promotion and order
//! slot maintenance propagate storage errors to the caller; per-session
//! transaction reconciliation fails closed and yields nothing on error.

use crate::store::{SessionRecord, Warehouse};
use crate::WarehouseError;
use spread_core::{
    ChainFact, Market, OrderBookFact, OrderLevel, RouteKey, SessionId, TransactionFact,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn Warehouse>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn Warehouse>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Warehouse> {
        &self.store
    }

    /// Replace the raw chain staging area with `batch` and promote every
    /// (symbol, chain) pair seen on two or more exchanges.
    pub async fn ingest_chains(&self, batch: &[ChainFact]) -> Result<(), WarehouseError> {
        self.store.replace_raw_chains(batch).await?;
        self.store.promote_chains().await?;
        info!(raw = batch.len(), "Chain batch ingested");
        Ok(())
    }

    /// Rebuild order-book slots from the curated chain set.
    pub async fn ingest_order_books(&self) -> Result<(), WarehouseError> {
        self.store.sync_order_slots().await?;
        debug!("Order-book slots synchronized with curated chains");
        Ok(())
    }

    /// Refresh prices of one slot. Returns false if the slot is gone.
    pub async fn update_prices(
        &self,
        exchange: Market,
        symbol: &str,
        asks: &[OrderLevel],
        bids: &[OrderLevel],
    ) -> Result<bool, WarehouseError> {
        let updated = self
            .store
            .update_order_prices(exchange, symbol, asks, bids)
            .await?;
        if !updated {
            debug!(%exchange, symbol, "Order-book slot no longer exists, price update skipped");
        }
        Ok(updated)
    }

    /// Mirror `batch` into the session's curated opportunities and return
    /// those not yet delivered, highest spread first.
    ///
    /// An empty batch touches nothing. Storage errors are logged and yield an
    /// empty result.
    pub async fn reconcile_transactions(
        &self,
        session: SessionId,
        batch: Vec<TransactionFact>,
    ) -> Vec<TransactionFact> {
        if batch.is_empty() {
            return Vec::new();
        }

        let batch: Vec<TransactionFact> = batch
            .into_iter()
            .map(|fact| fact.with_session(session))
            .collect();

        match self.store.reconcile_transactions(session, &batch).await {
            Ok(fresh) => {
                debug!(%session, raw = batch.len(), fresh = fresh.len(), "Transactions reconciled");
                fresh
            }
            Err(e) => {
                error!(%session, error = %e, "Transaction reconciliation failed");
                Vec::new()
            }
        }
    }

    /// All currently curated opportunities of a session.
    pub async fn transactions(&self, session: SessionId) -> Vec<TransactionFact> {
        self.store
            .transactions(session)
            .await
            .unwrap_or_else(|e| {
                error!(%session, error = %e, "Failed to read curated transactions");
                Vec::new()
            })
    }

    /// Point lookup by routing key. Storage errors read as "not found".
    pub async fn lookup(
        &self,
        session: SessionId,
        symbol: &str,
        market_from: &str,
        market_to: &str,
    ) -> Option<TransactionFact> {
        let route = RouteKey {
            market_from: market_from.to_string(),
            market_to: market_to.to_string(),
            symbol: symbol.to_string(),
        };
        match self.store.find_transaction(session, &route).await {
            Ok(found) => found,
            Err(e) => {
                warn!(%session, %route, error = %e, "Transaction lookup failed");
                None
            }
        }
    }

    pub async fn record_session(&self, record: &SessionRecord) -> Result<(), WarehouseError> {
        self.store.create_session(record).await
    }

    /// Sessions currently persisted, oldest first.
    pub async fn stored_sessions(&self) -> Result<Vec<SessionRecord>, WarehouseError> {
        self.store.sessions().await
    }

    /// Drop a session with its raw and curated transactions.
    pub async fn purge_session(&self, session: SessionId) -> Result<(), WarehouseError> {
        self.store.delete_session(session).await?;
        debug!(%session, "Session data purged");
        Ok(())
    }

    pub async fn purge_all_raw(&self) -> Result<u64, WarehouseError> {
        let removed = self.store.clear_raw_transactions().await?;
        info!(removed, "Raw transactions purged");
        Ok(removed)
    }

    pub async fn purge_all_curated(&self) -> Result<u64, WarehouseError> {
        let removed = self.store.clear_curated_transactions().await?;
        info!(removed, "Curated transactions purged");
        Ok(removed)
    }

    pub async fn purge_all_sessions(&self) -> Result<u64, WarehouseError> {
        let removed = self.store.clear_sessions().await?;
        info!(removed, "Stored sessions purged");
        Ok(removed)
    }

    pub async fn curated_chains(&self) -> Result<Vec<ChainFact>, WarehouseError> {
        self.store.curated_chains().await
    }

    pub async fn order_books(&self) -> Result<Vec<OrderBookFact>, WarehouseError> {
        self.store.order_books().await
    }

    pub async fn symbols_for(&self, exchange: Market) -> Result<Vec<String>, WarehouseError> {
        self.store.symbols_for(exchange).await
    }
}

//! SQLite adapter for the [`Warehouse`] interface.

use crate::store::{SessionRecord, Warehouse};
use crate::WarehouseError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spread_core::{
    ChainFact, Market, OrderBookFact, OrderLevel, RouteKey, ScanParams, SessionId,
    TransactionFact,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const TRANSACTION_COLUMNS: &str = "session_id, symbol, chain, market_from, market_to, spread, \
     withdraw_fee, withdraw_max, coin_amount, ask_order_count, ask_cost, ask_orders, \
     bid_order_count, bid_cost, bid_orders, delivered, updated_at";

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Curated transaction row as stored.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    session_id: i64,
    symbol: String,
    chain: String,
    market_from: String,
    market_to: String,
    spread: f64,
    withdraw_fee: f64,
    withdraw_max: f64,
    coin_amount: f64,
    ask_order_count: i64,
    ask_cost: f64,
    ask_orders: String,
    bid_order_count: i64,
    bid_cost: f64,
    bid_orders: String,
    delivered: bool,
    updated_at: i64,
}

impl TransactionRow {
    fn into_fact(self) -> Result<TransactionFact, WarehouseError> {
        Ok(TransactionFact {
            session_id: SessionId(self.session_id),
            symbol: self.symbol,
            chain: self.chain,
            market_from: self.market_from,
            market_to: self.market_to,
            spread: self.spread,
            withdraw_fee: self.withdraw_fee,
            withdraw_max: self.withdraw_max,
            coin_amount: self.coin_amount,
            ask_order_count: u32::try_from(self.ask_order_count).unwrap_or_default(),
            ask_cost: self.ask_cost,
            ask_orders: serde_json::from_str(&self.ask_orders)?,
            bid_order_count: u32::try_from(self.bid_order_count).unwrap_or_default(),
            bid_cost: self.bid_cost,
            bid_orders: serde_json::from_str(&self.bid_orders)?,
            delivered: self.delivered,
            updated_at: DateTime::from_timestamp_millis(self.updated_at),
        })
    }
}

async fn insert_raw_transaction(
    conn: &mut SqliteConnection,
    session: SessionId,
    fact: &TransactionFact,
    inserted_at: i64,
) -> Result<(), WarehouseError> {
    let ask_orders = serde_json::to_string(&fact.ask_orders)?;
    let bid_orders = serde_json::to_string(&fact.bid_orders)?;

    sqlx::query(
        r#"
        INSERT INTO raw_transactions (
            session_id, symbol, chain, market_from, market_to, spread, withdraw_fee,
            withdraw_max, coin_amount, ask_order_count, ask_cost, ask_orders,
            bid_order_count, bid_cost, bid_orders, inserted_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.0)
    .bind(&fact.symbol)
    .bind(&fact.chain)
    .bind(&fact.market_from)
    .bind(&fact.market_to)
    .bind(fact.spread)
    .bind(fact.withdraw_fee)
    .bind(fact.withdraw_max)
    .bind(fact.coin_amount)
    .bind(i64::from(fact.ask_order_count))
    .bind(fact.ask_cost)
    .bind(&ask_orders)
    .bind(i64::from(fact.bid_order_count))
    .bind(fact.bid_cost)
    .bind(&bid_orders)
    .bind(inserted_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// SQLite-backed warehouse.
#[derive(Clone)]
pub struct SqliteWarehouse {
    pool: SqlitePool,
}

impl SqliteWarehouse {
    /// Connect to the database at `database_url` and create the schema.
    ///
    /// In-memory databases are limited to one connection so every statement
    /// sees the same data.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, WarehouseError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), WarehouseError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS raw_chains (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exchange TEXT NOT NULL,
                symbol TEXT NOT NULL,
                chain TEXT NOT NULL,
                withdraw_min REAL NOT NULL DEFAULT 0,
                withdraw_max REAL NOT NULL DEFAULT 0,
                withdraw_fee REAL NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS dwh_chains (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exchange TEXT NOT NULL,
                symbol TEXT NOT NULL,
                chain TEXT NOT NULL,
                withdraw_min REAL NOT NULL DEFAULT 0,
                withdraw_max REAL NOT NULL DEFAULT 0,
                withdraw_fee REAL NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                UNIQUE(exchange, symbol, chain)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS dwh_orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exchange TEXT NOT NULL,
                symbol TEXT NOT NULL,
                ask_price TEXT NOT NULL DEFAULT '[]',
                bid_price TEXT NOT NULL DEFAULT '[]',
                updated_at INTEGER NOT NULL,
                UNIQUE(exchange, symbol)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS raw_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                chain TEXT NOT NULL,
                market_from TEXT NOT NULL,
                market_to TEXT NOT NULL,
                spread REAL NOT NULL,
                withdraw_fee REAL NOT NULL,
                withdraw_max REAL NOT NULL,
                coin_amount REAL NOT NULL,
                ask_order_count INTEGER NOT NULL,
                ask_cost REAL NOT NULL,
                ask_orders TEXT NOT NULL DEFAULT '[]',
                bid_order_count INTEGER NOT NULL,
                bid_cost REAL NOT NULL,
                bid_orders TEXT NOT NULL DEFAULT '[]',
                inserted_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_raw_transactions_session
            ON raw_transactions(session_id)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS dwh_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                chain TEXT NOT NULL,
                market_from TEXT NOT NULL,
                market_to TEXT NOT NULL,
                spread REAL NOT NULL,
                withdraw_fee REAL NOT NULL,
                withdraw_max REAL NOT NULL,
                coin_amount REAL NOT NULL,
                ask_order_count INTEGER NOT NULL,
                ask_cost REAL NOT NULL,
                ask_orders TEXT NOT NULL DEFAULT '[]',
                bid_order_count INTEGER NOT NULL,
                bid_cost REAL NOT NULL,
                bid_orders TEXT NOT NULL DEFAULT '[]',
                delivered INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                UNIQUE(session_id, symbol, chain, market_from, market_to)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id INTEGER PRIMARY KEY,
                usdt INTEGER NOT NULL,
                spread_min REAL NOT NULL,
                spread_max REAL,
                created_at INTEGER NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn replace_raw_chains(&self, batch: &[ChainFact]) -> Result<(), WarehouseError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM raw_chains")
            .execute(&mut *tx)
            .await?;

        for fact in batch {
            sqlx::query(
                r#"
                INSERT INTO raw_chains (exchange, symbol, chain, withdraw_min, withdraw_max, withdraw_fee, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(fact.exchange.as_str())
            .bind(&fact.symbol)
            .bind(&fact.chain)
            .bind(fact.withdraw_min)
            .bind(fact.withdraw_max)
            .bind(fact.withdraw_fee)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn promote_chains(&self) -> Result<(), WarehouseError> {
        let mut tx = self.pool.begin().await?;

        let staged = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw_chains")
            .fetch_one(&mut *tx)
            .await?;
        if staged == 0 {
            debug!("No raw chains staged, curated chains left untouched");
            return Ok(());
        }

        // A curated row survives only if its exact (exchange, symbol, chain)
        // is staged and the pair is seen on two or more exchanges.
        sqlx::query(
            r#"
            DELETE FROM dwh_chains
            WHERE NOT EXISTS (
                SELECT 1 FROM raw_chains r
                WHERE r.exchange = dwh_chains.exchange
                  AND r.symbol = dwh_chains.symbol
                  AND r.chain = dwh_chains.chain
                  AND (
                      SELECT COUNT(DISTINCT p.exchange) FROM raw_chains p
                      WHERE p.symbol = r.symbol AND p.chain = r.chain
                  ) >= 2
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO dwh_chains (exchange, symbol, chain, withdraw_min, withdraw_max, withdraw_fee, updated_at)
            SELECT r.exchange, r.symbol, r.chain, r.withdraw_min, r.withdraw_max, r.withdraw_fee, ?
            FROM raw_chains r
            WHERE (
                SELECT COUNT(DISTINCT p.exchange) FROM raw_chains p
                WHERE p.symbol = r.symbol AND p.chain = r.chain
            ) >= 2
            ON CONFLICT (exchange, symbol, chain) DO UPDATE
            SET
                withdraw_min = excluded.withdraw_min,
                withdraw_max = excluded.withdraw_max,
                withdraw_fee = excluded.withdraw_fee,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(now_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn curated_chains(&self) -> Result<Vec<ChainFact>, WarehouseError> {
        let rows = sqlx::query_as::<_, (String, String, String, f64, f64, f64)>(
            r#"
            SELECT exchange, symbol, chain, withdraw_min, withdraw_max, withdraw_fee
            FROM dwh_chains
            ORDER BY symbol, chain, exchange
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let chains = rows
            .into_iter()
            .filter_map(|(exchange, symbol, chain, min, max, fee)| {
                match Market::from_str(&exchange) {
                    Ok(market) => Some(ChainFact::new(market, symbol, chain).with_limits(min, max, fee)),
                    Err(e) => {
                        warn!(error = %e, "Skipping curated chain row");
                        None
                    }
                }
            })
            .collect();

        Ok(chains)
    }

    async fn sync_order_slots(&self) -> Result<(), WarehouseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM dwh_orders
            WHERE NOT EXISTS (
                SELECT 1 FROM dwh_chains c
                WHERE c.exchange = dwh_orders.exchange AND c.symbol = dwh_orders.symbol
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO dwh_orders (exchange, symbol, updated_at)
            SELECT DISTINCT exchange, symbol, ?
            FROM dwh_chains
            WHERE true
            ON CONFLICT (exchange, symbol) DO UPDATE
            SET updated_at = excluded.updated_at
            "#,
        )
        .bind(now_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_order_prices(
        &self,
        exchange: Market,
        symbol: &str,
        asks: &[OrderLevel],
        bids: &[OrderLevel],
    ) -> Result<bool, WarehouseError> {
        let ask_json = serde_json::to_string(asks)?;
        let bid_json = serde_json::to_string(bids)?;

        let result = sqlx::query(
            r#"
            UPDATE dwh_orders
            SET ask_price = ?, bid_price = ?, updated_at = ?
            WHERE exchange = ? AND symbol = ?
            "#,
        )
        .bind(&ask_json)
        .bind(&bid_json)
        .bind(now_millis())
        .bind(exchange.as_str())
        .bind(symbol)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn order_books(&self) -> Result<Vec<OrderBookFact>, WarehouseError> {
        let rows = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT exchange, symbol, ask_price, bid_price FROM dwh_orders ORDER BY exchange, symbol",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut books = Vec::with_capacity(rows.len());
        for (exchange, symbol, ask_json, bid_json) in rows {
            let exchange = match Market::from_str(&exchange) {
                Ok(market) => market,
                Err(e) => {
                    warn!(error = %e, "Skipping order-book row");
                    continue;
                }
            };
            books.push(OrderBookFact {
                exchange,
                symbol,
                asks: serde_json::from_str(&ask_json)?,
                bids: serde_json::from_str(&bid_json)?,
            });
        }

        Ok(books)
    }

    async fn symbols_for(&self, exchange: Market) -> Result<Vec<String>, WarehouseError> {
        let symbols = sqlx::query_scalar::<_, String>(
            "SELECT symbol FROM dwh_orders WHERE exchange = ? ORDER BY symbol",
        )
        .bind(exchange.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(symbols)
    }

    async fn reconcile_transactions(
        &self,
        session: SessionId,
        batch: &[TransactionFact],
    ) -> Result<Vec<TransactionFact>, WarehouseError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM raw_transactions WHERE session_id = ?")
            .bind(session.0)
            .execute(&mut *tx)
            .await?;

        for fact in batch {
            insert_raw_transaction(&mut *tx, session, fact, now).await?;
        }

        sqlx::query(
            r#"
            DELETE FROM dwh_transactions
            WHERE session_id = ?
              AND NOT EXISTS (
                  SELECT 1 FROM raw_transactions r
                  WHERE r.session_id = dwh_transactions.session_id
                    AND r.symbol = dwh_transactions.symbol
                    AND r.chain = dwh_transactions.chain
                    AND r.market_from = dwh_transactions.market_from
                    AND r.market_to = dwh_transactions.market_to
              )
            "#,
        )
        .bind(session.0)
        .execute(&mut *tx)
        .await?;

        // `delivered` is only written on first insert.
        sqlx::query(
            r#"
            INSERT INTO dwh_transactions (
                session_id, symbol, chain, market_from, market_to, spread, withdraw_fee,
                withdraw_max, coin_amount, ask_order_count, ask_cost, ask_orders,
                bid_order_count, bid_cost, bid_orders, delivered, updated_at
            )
            SELECT
                session_id, symbol, chain, market_from, market_to, spread, withdraw_fee,
                withdraw_max, coin_amount, ask_order_count, ask_cost, ask_orders,
                bid_order_count, bid_cost, bid_orders, 0, ?
            FROM raw_transactions
            WHERE session_id = ?
            ON CONFLICT (session_id, symbol, chain, market_from, market_to) DO UPDATE
            SET
                spread = excluded.spread,
                withdraw_fee = excluded.withdraw_fee,
                withdraw_max = excluded.withdraw_max,
                coin_amount = excluded.coin_amount,
                ask_order_count = excluded.ask_order_count,
                ask_cost = excluded.ask_cost,
                ask_orders = excluded.ask_orders,
                bid_order_count = excluded.bid_order_count,
                bid_cost = excluded.bid_cost,
                bid_orders = excluded.bid_orders,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(now)
        .bind(session.0)
        .execute(&mut *tx)
        .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM dwh_transactions \
             WHERE session_id = ? AND delivered = 0 ORDER BY spread DESC, id"
        ))
        .bind(session.0)
        .fetch_all(&mut *tx)
        .await?;

        let fresh = rows
            .into_iter()
            .map(TransactionRow::into_fact)
            .collect::<Result<Vec<_>, _>>()?;

        sqlx::query("UPDATE dwh_transactions SET delivered = 1 WHERE session_id = ? AND delivered = 0")
            .bind(session.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(fresh)
    }

    async fn transactions(
        &self,
        session: SessionId,
    ) -> Result<Vec<TransactionFact>, WarehouseError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM dwh_transactions \
             WHERE session_id = ? ORDER BY spread DESC, id"
        ))
        .bind(session.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRow::into_fact).collect()
    }

    async fn find_transaction(
        &self,
        session: SessionId,
        route: &RouteKey,
    ) -> Result<Option<TransactionFact>, WarehouseError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM dwh_transactions \
             WHERE session_id = ? AND symbol = ? AND market_from = ? AND market_to = ? \
             ORDER BY spread DESC LIMIT 1"
        ))
        .bind(session.0)
        .bind(&route.symbol)
        .bind(&route.market_from)
        .bind(&route.market_to)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_fact).transpose()
    }

    async fn clear_raw_transactions(&self) -> Result<u64, WarehouseError> {
        let result = sqlx::query("DELETE FROM raw_transactions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_curated_transactions(&self) -> Result<u64, WarehouseError> {
        let result = sqlx::query("DELETE FROM dwh_transactions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_session(&self, record: &SessionRecord) -> Result<(), WarehouseError> {
        let usdt = i64::try_from(record.params.usdt)
            .map_err(|_| WarehouseError::InvalidRow(format!("usdt out of range: {}", record.params.usdt)))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, usdt, spread_min, spread_max, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (session_id) DO UPDATE
            SET
                usdt = excluded.usdt,
                spread_min = excluded.spread_min,
                spread_max = excluded.spread_max,
                created_at = excluded.created_at
            "#,
        )
        .bind(record.id.0)
        .bind(usdt)
        .bind(record.params.spread_min)
        .bind(record.params.spread_max)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_session(&self, session: SessionId) -> Result<(), WarehouseError> {
        let mut tx = self.pool.begin().await?;

        for statement in [
            "DELETE FROM raw_transactions WHERE session_id = ?",
            "DELETE FROM dwh_transactions WHERE session_id = ?",
            "DELETE FROM sessions WHERE session_id = ?",
        ] {
            sqlx::query(statement)
                .bind(session.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<SessionRecord>, WarehouseError> {
        let rows = sqlx::query_as::<_, (i64, i64, f64, Option<f64>, i64)>(
            "SELECT session_id, usdt, spread_min, spread_max, created_at FROM sessions ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, usdt, spread_min, spread_max, created_at)| -> Result<SessionRecord, WarehouseError> {
                let usdt = u64::try_from(usdt)
                    .map_err(|_| WarehouseError::InvalidRow(format!("negative usdt for session {id}")))?;
                let created_at = DateTime::from_timestamp_millis(created_at)
                    .ok_or_else(|| WarehouseError::InvalidRow(format!("bad timestamp for session {id}")))?;
                Ok(SessionRecord {
                    id: SessionId(id),
                    params: ScanParams {
                        usdt,
                        spread_min,
                        spread_max,
                    },
                    created_at,
                })
            })
            .collect()
    }

    async fn clear_sessions(&self) -> Result<u64, WarehouseError> {
        let result = sqlx::query("DELETE FROM sessions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn memory() -> SqliteWarehouse {
        SqliteWarehouse::connect("sqlite::memory:", 5).await.unwrap()
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = memory().await;
        db.run_migrations().await.unwrap();
        assert!(db.curated_chains().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_crud() {
        let db = memory().await;
        let record = SessionRecord {
            id: SessionId(7),
            params: ScanParams::range(100, 0.3, 0.8),
            created_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };
        db.create_session(&record).await.unwrap();

        let legacy = SessionRecord {
            id: SessionId(8),
            params: ScanParams::legacy(50, 1.0),
            created_at: DateTime::from_timestamp_millis(1_700_000_000_001).unwrap(),
        };
        db.create_session(&legacy).await.unwrap();

        assert_eq!(db.sessions().await.unwrap(), vec![record, legacy]);

        db.delete_session(SessionId(7)).await.unwrap();
        let remaining = db.sessions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, SessionId(8));

        assert_eq!(db.clear_sessions().await.unwrap(), 1);
        assert!(db.sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_prices_round_trip_through_json() {
        let db = memory().await;
        db.replace_raw_chains(&[
            ChainFact::new(Market::Bybit, "ETH", "ARB"),
            ChainFact::new(Market::Mexc, "ETH", "ARB"),
        ])
        .await
        .unwrap();
        db.promote_chains().await.unwrap();
        db.sync_order_slots().await.unwrap();

        let asks = vec![OrderLevel::new(3000.5, 1.25), OrderLevel::new(3001.0, 2.0)];
        let bids = vec![OrderLevel::new(2999.0, 0.5)];
        let updated = db
            .update_order_prices(Market::Mexc, "ETH", &asks, &bids)
            .await
            .unwrap();
        assert!(updated);

        let books = db.order_books().await.unwrap();
        let mexc = books.iter().find(|b| b.exchange == Market::Mexc).unwrap();
        assert_eq!(mexc.asks, asks);
        assert_eq!(mexc.bids, bids);

        let bybit = books.iter().find(|b| b.exchange == Market::Bybit).unwrap();
        assert!(bybit.asks.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_exchange_rows_are_skipped() {
        let db = memory().await;
        sqlx::query(
            "INSERT INTO dwh_chains (exchange, symbol, chain, updated_at) VALUES ('NOPE', 'BTC', 'ERC20', 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap();
        assert!(db.curated_chains().await.unwrap().is_empty());
    }
}

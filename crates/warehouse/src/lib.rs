//! Raw → curated warehousing for chain metadata, order-book slots and
//! per-session opportunity delivery state.
//!
//! This crate provides:
//! - The [`Warehouse`] storage interface and its SQLite adapter
//! - Startup connection supervision with primary/fallback targets
//! - The [`ReconciliationEngine`] that owns promotion and delivery rules

pub mod engine;
pub mod error;
pub mod sqlite;
pub mod store;
pub mod supervisor;

pub use engine::ReconciliationEngine;
pub use error::WarehouseError;
pub use sqlite::SqliteWarehouse;
pub use store::{SessionRecord, Warehouse};
pub use supervisor::{ConnectionSupervisor, RetryPolicy};

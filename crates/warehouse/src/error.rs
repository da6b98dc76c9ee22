//! Error types for warehouse operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to encode or decode order levels: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("Gave up connecting after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<WarehouseError>,
    },
}

impl WarehouseError {
    /// Returns true for network-level failures that may succeed on retry.
    /// Everything else (bad URL, schema errors, decode errors) is fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            WarehouseError::Sqlx(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

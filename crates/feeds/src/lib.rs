//! Client side of the external market-data service.
//!
//! The service computes spread opportunities; this crate only fetches and
//! decodes them.
//!
//! - `client` - [`MarketDataSource`] seam and the reqwest-backed [`SpotClient`]
//! - `wire` - tolerant decoding of opportunity records

pub mod client;
pub mod error;
pub mod wire;

pub use client::{MarketDataSource, SpotClient};
pub use error::FeedError;
pub use wire::SpotDeal;

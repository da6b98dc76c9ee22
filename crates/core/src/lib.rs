//! Core data types for the spread notification bot.

pub mod chain;
pub mod exchange;
pub mod orderbook;
pub mod session;
pub mod transaction;

pub use chain::*;
pub use exchange::*;
pub use orderbook::*;
pub use session::*;
pub use transaction::*;

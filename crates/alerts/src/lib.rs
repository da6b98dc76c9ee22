//! Telegram front end for spread notifications.
//!
//! This crate provides:
//! - Chat command parsing and reply rendering
//! - The [`ChatTransport`] seam and its Telegram implementation
//! - The [`SessionManager`] that runs one bounded polling task per chat
//! - The [`BotService`] glue between chat events and sessions

pub mod bot;
pub mod commands;
pub mod render;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::BotService;
pub use commands::{Command, InvalidParams};
pub use session::{SessionConfig, SessionManager, StartOutcome, StopOutcome};
pub use transport::{ChatTransport, Choice, TelegramTransport, TransportError};

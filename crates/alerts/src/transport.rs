//! Outbound chat messaging.

use crate::commands::HELP_KEYWORD;
use async_trait::async_trait;
use spread_core::SessionId;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use thiserror::Error;

/// Telegram accepts at most 100 inline buttons per message.
const MAX_BUTTONS_PER_MESSAGE: usize = 100;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// A selectable entry: visible label plus the callback payload it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub payload: String,
}

/// Messaging endpoint for one chat per session.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat: SessionId, text: &str) -> Result<(), TransportError>;

    async fn send_choices(
        &self,
        chat: SessionId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<(), TransportError>;
}

/// [`ChatTransport`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn help_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(HELP_KEYWORD)]])
}

fn choice_keyboard(choices: &[Choice]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(choices.iter().map(|choice| {
        vec![InlineKeyboardButton::callback(
            choice.label.clone(),
            choice.payload.clone(),
        )]
    }))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat: SessionId, text: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(ChatId(chat.0), text)
            .reply_markup(help_keyboard())
            .await?;
        Ok(())
    }

    async fn send_choices(
        &self,
        chat: SessionId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<(), TransportError> {
        for chunk in choices.chunks(MAX_BUTTONS_PER_MESSAGE) {
            self.bot
                .send_message(ChatId(chat.0), prompt)
                .reply_markup(choice_keyboard(chunk))
                .await?;
        }
        Ok(())
    }
}

//! Chat event handling and the Telegram dispatcher.

use crate::commands::Command;
use crate::render;
use crate::session::{SessionManager, StartOutcome, StopOutcome};
use crate::transport::{ChatTransport, TransportError};
use spread_core::{RouteKey, SessionId};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::{info, warn};

/// Chat a button press belongs to: the chat of the message carrying the
/// button, or the presser's private chat when that message is unavailable.
fn callback_chat(message_chat: Option<ChatId>, from: UserId) -> SessionId {
    SessionId(message_chat.unwrap_or_else(|| ChatId::from(from)).0)
}

/// Routes chat text and button callbacks to the session manager.
pub struct BotService {
    sessions: Arc<SessionManager>,
    transport: Arc<dyn ChatTransport>,
}

impl BotService {
    pub fn new(sessions: Arc<SessionManager>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            sessions,
            transport,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one inbound text message.
    pub async fn handle_text(&self, chat: SessionId, text: &str) -> Result<(), TransportError> {
        info!(
            chat = %chat,
            text,
            free_slots = self.sessions.available_slots(),
            "Received message"
        );

        match Command::parse(text) {
            Command::Help => self.transport.send_text(chat, render::INSTRUCTIONS).await,

            Command::Start(params) => {
                let reply = match self.sessions.start(chat, params) {
                    StartOutcome::Started => render::SESSION_STARTED,
                    StartOutcome::AlreadyActive => render::SESSION_ACTIVE,
                    StartOutcome::Busy => render::TRY_LATER,
                };
                self.transport.send_text(chat, reply).await
            }

            Command::Invalid(err) => {
                self.transport
                    .send_text(chat, &render::invalid_params(&err))
                    .await
            }

            Command::Stop => {
                let reply = match self.sessions.stop(chat).await {
                    StopOutcome::Stopped => render::SESSION_CANCELLED,
                    StopOutcome::NotActive => render::NO_ACTIVE_SESSION,
                };
                self.transport.send_text(chat, reply).await
            }

            Command::ListAll => {
                let deals = self.sessions.list_all(chat).await;
                if deals.is_empty() {
                    return self.transport.send_text(chat, render::NO_TRANSACTIONS).await;
                }
                self.transport
                    .send_choices(chat, render::CHOOSE_DEAL, &render::deal_choices(&deals))
                    .await
            }

            Command::Unknown => self.transport.send_text(chat, render::NOT_UNDERSTOOD).await,
        }
    }

    /// Handle a deal button press carrying `from/to/symbol`.
    pub async fn handle_callback(&self, chat: SessionId, data: &str) -> Result<(), TransportError> {
        info!(chat = %chat, data, "User pressed button");

        let route = match data.parse::<RouteKey>() {
            Ok(route) => route,
            Err(e) => {
                warn!(chat = %chat, error = %e, "Ignoring malformed callback");
                return self.transport.send_text(chat, render::NOT_UNDERSTOOD).await;
            }
        };

        match self.sessions.lookup(chat, &route).await {
            Some(deal) => self.transport.send_text(chat, &deal.detail_text()).await,
            None => self.transport.send_text(chat, render::NO_LONGER_TRACKED).await,
        }
    }

    async fn on_message(&self, msg: Message) -> Result<(), TransportError> {
        let Some(text) = msg.text() else {
            return Ok(());
        };
        self.handle_text(SessionId(msg.chat.id.0), text).await
    }

    async fn on_callback(&self, bot: Bot, query: CallbackQuery) -> Result<(), TransportError> {
        bot.answer_callback_query(query.id.clone()).await?;
        let Some(data) = query.data.as_deref() else {
            return Ok(());
        };
        let chat = callback_chat(
            query.message.as_ref().map(|message| message.chat().id),
            query.from.id,
        );
        self.handle_callback(chat, data).await
    }

    /// Run the long-polling dispatcher until ctrl-c.
    pub async fn run(self: Arc<Self>, bot: Bot) {
        let on_message = Arc::clone(&self);
        let on_callback = self;

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                let this = Arc::clone(&on_message);
                async move { this.on_message(msg).await }
            }))
            .branch(Update::filter_callback_query().endpoint(
                move |bot: Bot, query: CallbackQuery| {
                    let this = Arc::clone(&on_callback);
                    async move { this.on_callback(bot, query).await }
                },
            ));

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, warn};

use crate::backend::BackendGateway;
use crate::dispatcher::SessionDispatcher;
use crate::fsm::RawEvent;

use super::message_handler::deliver;

/// Handle callback queries from inline keyboards
pub async fn callback_handler<B: BackendGateway>(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<SessionDispatcher<B>>,
) -> Result<()> {
    let user_id = q.from.id.0 as i64;
    let language_code = q.from.language_code.clone();
    debug!(user_id, data = ?q.data, "Received callback query from user");

    // Stop the button spinner before the turn runs
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id, error = %e, "Failed to answer callback query");
    }

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let chat_id = q.message.as_ref().map(|m| m.chat().id).unwrap_or(ChatId(user_id));

    let replies = dispatcher
        .on_event(user_id, language_code.clone(), RawEvent::Callback(data))
        .await;
    deliver(&bot, chat_id, &replies, language_code.as_deref(), &dispatcher).await
}

//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::backend::BackendGateway;
use crate::dispatcher::SessionDispatcher;
use crate::fsm::{Outbound, RawEvent};
use crate::localization::t_lang;

use super::ui_builder::{format_admin_alert, render_reply};

/// Send the replies of one turn, in order, and forward admin alerts
pub async fn deliver<B: BackendGateway>(
    bot: &Bot,
    chat_id: ChatId,
    outbound: &[Outbound],
    language_code: Option<&str>,
    dispatcher: &SessionDispatcher<B>,
) -> Result<()> {
    for message in outbound {
        match message {
            Outbound::Reply(reply) => {
                let (text, keyboard) = render_reply(reply, language_code);
                let request = bot.send_message(chat_id, text);
                match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await?,
                    None => request.await?,
                };
            }
            Outbound::AdminAlert { user_id, kind, detail } => {
                for admin in dispatcher.admin_ids() {
                    let text = format_admin_alert(*user_id, *kind, detail, None);
                    if let Err(e) = bot.send_message(ChatId(admin), text).await {
                        error!(admin_id = admin, error = %e, "Failed to deliver admin alert");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message, language_code: Option<&str>) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");
    bot.send_message(msg.chat.id, t_lang("unsupported-message", language_code))
        .await?;
    Ok(())
}

pub async fn message_handler<B: BackendGateway>(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<SessionDispatcher<B>>,
) -> Result<()> {
    // Channel posts have no sender
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let language_code = user.language_code.clone();

    let Some(text) = msg.text() else {
        return handle_unsupported_message(&bot, &msg, language_code.as_deref()).await;
    };
    debug!(user_id, message_length = text.len(), "Received text message from user");

    let replies = dispatcher
        .on_event(user_id, language_code.clone(), RawEvent::from_text(text))
        .await;
    deliver(&bot, msg.chat.id, &replies, language_code.as_deref(), &dispatcher).await
}

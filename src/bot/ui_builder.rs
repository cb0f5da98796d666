//! UI Builder module for rendering dialog replies as Telegram messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::dialogue::MetaKind;
use crate::fsm::{Button, ButtonLabel, Reply};
use crate::localization::{t_args_lang, t_lang};

/// Render a reply into message text and an optional inline keyboard
pub fn render_reply(reply: &Reply, language_code: Option<&str>) -> (String, Option<InlineKeyboardMarkup>) {
    let args: Vec<(&str, &str)> = reply.args.iter().map(|(name, value)| (*name, value.as_str())).collect();
    let text = t_args_lang(reply.key, &args, language_code);

    let keyboard = if reply.keyboard.is_empty() {
        None
    } else {
        Some(create_keyboard(&reply.keyboard, language_code))
    };
    (text, keyboard)
}

/// Create an inline keyboard from button rows
pub fn create_keyboard(rows: &[Vec<Button>], language_code: Option<&str>) -> InlineKeyboardMarkup {
    let buttons = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| InlineKeyboardButton::callback(button_text(&button.label, language_code), button.action.token()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(buttons)
}

pub fn button_text(label: &ButtonLabel, language_code: Option<&str>) -> String {
    match label {
        ButtonLabel::Key(key) => t_lang(key, language_code),
        ButtonLabel::Toggle(key, on) => {
            let marker = if *on { "✅" } else { "⬜" };
            format!("{} {}", marker, t_lang(key, language_code))
        }
        ButtonLabel::Literal(text) => text.clone(),
    }
}

/// Alert text sent to admin chats
pub fn format_admin_alert(user_id: i64, kind: MetaKind, detail: &str, language_code: Option<&str>) -> String {
    let user_id = user_id.to_string();
    let kind = format!("{kind:?}");
    t_args_lang(
        "admin-alert",
        &[("user_id", user_id.as_str()), ("kind", kind.as_str()), ("detail", detail)],
        language_code,
    )
}

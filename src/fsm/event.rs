//! Inbound events: the raw shape delivered by the transport and the closed
//! set of commands and callback actions the dialog understands.

use regex::Regex;
use std::sync::LazyLock;

use crate::word_model::HintType;

static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s+(.*))?$").expect("command pattern is valid")
});

/// Event as received from the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    Command { name: String, args: String },
    Text(String),
    Callback(String),
}

impl RawEvent {
    /// Classify a text message: `/name@bot args` becomes a command
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        match COMMAND_PATTERN.captures(trimmed) {
            Some(caps) => RawEvent::Command {
                name: caps[1].to_lowercase(),
                args: caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
            },
            None => RawEvent::Text(text.to_string()),
        }
    }
}

/// Commands the bot registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Language,
    Settings,
    Study,
    Help,
    Retry,
    Reset,
    Unknown(String),
}

impl Command {
    pub fn parse(name: &str) -> Self {
        match name {
            "start" => Command::Start,
            "cancel" => Command::Cancel,
            "language" => Command::Language,
            "settings" => Command::Settings,
            "study" => Command::Study,
            "help" => Command::Help,
            "retry" => Command::Retry,
            "reset" => Command::Reset,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Settings that can be flipped from the settings keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFlag {
    SkipMarked,
    UseCheckDate,
    ShowHints,
    HintVisibility(HintType),
}

/// Inline keyboard actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    SelectLanguage(String),
    EditStartWord,
    Toggle(SettingsFlag),
    StartStudy,
    Know,
    DontKnow,
    Confirm,
    Retract,
    Next,
    Back,
    Skip,
    ShowImage,
    ShowHint(HintType),
    CreateHint(HintType),
    EditHint(HintType),
    MetaRetry,
    MetaReset,
    /// Stale or foreign callback data
    Unrecognized(String),
}

impl CallbackAction {
    /// Callback data sent with the button
    pub fn token(&self) -> String {
        match self {
            CallbackAction::SelectLanguage(id) => format!("lang:{id}"),
            CallbackAction::EditStartWord => "settings:start_word".to_string(),
            CallbackAction::Toggle(SettingsFlag::SkipMarked) => "settings:toggle:skip_marked".to_string(),
            CallbackAction::Toggle(SettingsFlag::UseCheckDate) => "settings:toggle:use_check_date".to_string(),
            CallbackAction::Toggle(SettingsFlag::ShowHints) => "settings:toggle:show_hints".to_string(),
            CallbackAction::Toggle(SettingsFlag::HintVisibility(t)) => format!("settings:toggle:hint:{t}"),
            CallbackAction::StartStudy => "settings:study".to_string(),
            CallbackAction::Know => "study:know".to_string(),
            CallbackAction::DontKnow => "study:dont_know".to_string(),
            CallbackAction::Confirm => "study:confirm".to_string(),
            CallbackAction::Retract => "study:retract".to_string(),
            CallbackAction::Next => "study:next".to_string(),
            CallbackAction::Back => "study:back".to_string(),
            CallbackAction::Skip => "study:skip".to_string(),
            CallbackAction::ShowImage => "study:image".to_string(),
            CallbackAction::ShowHint(t) => format!("hint:show:{t}"),
            CallbackAction::CreateHint(t) => format!("hint:create:{t}"),
            CallbackAction::EditHint(t) => format!("hint:edit:{t}"),
            CallbackAction::MetaRetry => "meta:retry".to_string(),
            CallbackAction::MetaReset => "meta:reset".to_string(),
            CallbackAction::Unrecognized(raw) => raw.clone(),
        }
    }

    pub fn parse(data: &str) -> Self {
        let parts: Vec<&str> = data.split(':').collect();
        let parsed = match parts.as_slice() {
            ["lang", id] if !id.is_empty() => Some(CallbackAction::SelectLanguage(id.to_string())),
            ["settings", "start_word"] => Some(CallbackAction::EditStartWord),
            ["settings", "study"] => Some(CallbackAction::StartStudy),
            ["settings", "toggle", "skip_marked"] => Some(CallbackAction::Toggle(SettingsFlag::SkipMarked)),
            ["settings", "toggle", "use_check_date"] => Some(CallbackAction::Toggle(SettingsFlag::UseCheckDate)),
            ["settings", "toggle", "show_hints"] => Some(CallbackAction::Toggle(SettingsFlag::ShowHints)),
            ["settings", "toggle", "hint", t] => {
                HintType::from_token(t).map(|t| CallbackAction::Toggle(SettingsFlag::HintVisibility(t)))
            }
            ["study", "know"] => Some(CallbackAction::Know),
            ["study", "dont_know"] => Some(CallbackAction::DontKnow),
            ["study", "confirm"] => Some(CallbackAction::Confirm),
            ["study", "retract"] => Some(CallbackAction::Retract),
            ["study", "next"] => Some(CallbackAction::Next),
            ["study", "back"] => Some(CallbackAction::Back),
            ["study", "skip"] => Some(CallbackAction::Skip),
            ["study", "image"] => Some(CallbackAction::ShowImage),
            ["hint", "show", t] => HintType::from_token(t).map(CallbackAction::ShowHint),
            ["hint", "create", t] => HintType::from_token(t).map(CallbackAction::CreateHint),
            ["hint", "edit", t] => HintType::from_token(t).map(CallbackAction::EditHint),
            ["meta", "retry"] => Some(CallbackAction::MetaRetry),
            ["meta", "reset"] => Some(CallbackAction::MetaReset),
            _ => None,
        };
        parsed.unwrap_or_else(|| CallbackAction::Unrecognized(data.to_string()))
    }
}

/// Classified inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command { command: Command, args: String },
    Text(String),
    Callback(CallbackAction),
}

impl Event {
    pub fn parse(raw: RawEvent) -> Self {
        match raw {
            RawEvent::Command { name, args } => Event::Command {
                command: Command::parse(&name.to_lowercase()),
                args,
            },
            RawEvent::Text(text) => Event::Text(text),
            RawEvent::Callback(data) => Event::Callback(CallbackAction::parse(&data)),
        }
    }

    pub fn command(&self) -> Option<&Command> {
        match self {
            Event::Command { command, .. } => Some(command),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_command() {
        assert_eq!(
            RawEvent::from_text("/start"),
            RawEvent::Command {
                name: "start".to_string(),
                args: String::new()
            }
        );
        assert_eq!(
            RawEvent::from_text("/Study@lexicon_bot  now please "),
            RawEvent::Command {
                name: "study".to_string(),
                args: "now please".to_string()
            }
        );
        assert_eq!(RawEvent::from_text("42"), RawEvent::Text("42".to_string()));
        assert_eq!(RawEvent::from_text("a / b"), RawEvent::Text("a / b".to_string()));
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("cancel"), Command::Cancel);
        assert_eq!(Command::parse("frobnicate"), Command::Unknown("frobnicate".to_string()));
    }

    #[test]
    fn test_callback_tokens_parse_back() {
        let actions = [
            CallbackAction::SelectLanguage("de".to_string()),
            CallbackAction::Toggle(SettingsFlag::HintVisibility(HintType::PhoneticSound)),
            CallbackAction::Toggle(SettingsFlag::UseCheckDate),
            CallbackAction::DontKnow,
            CallbackAction::EditHint(HintType::Meaning),
            CallbackAction::MetaReset,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.token()), action);
        }
    }

    #[test]
    fn test_unrecognized_callback() {
        assert_eq!(
            CallbackAction::parse("hint:show:smell"),
            CallbackAction::Unrecognized("hint:show:smell".to_string())
        );
        assert_eq!(CallbackAction::parse("lang:"), CallbackAction::Unrecognized("lang:".to_string()));
        assert_eq!(CallbackAction::parse(""), CallbackAction::Unrecognized(String::new()));
    }
}

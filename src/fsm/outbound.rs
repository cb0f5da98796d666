//! Outbound messages produced by the dialog core.
//!
//! Replies carry localization keys and arguments, never rendered text, so the
//! core stays independent of the transport and of the interface language.

use crate::dialogue::MetaKind;
use crate::fsm::event::CallbackAction;

/// Text shown on an inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonLabel {
    /// Localization key
    Key(&'static str),
    /// Localization key prefixed with an on/off marker
    Toggle(&'static str, bool),
    /// Text shown as is (language names)
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: ButtonLabel,
    pub action: CallbackAction,
}

impl Button {
    pub fn key(key: &'static str, action: CallbackAction) -> Self {
        Self {
            label: ButtonLabel::Key(key),
            action,
        }
    }

    pub fn toggle(key: &'static str, on: bool, action: CallbackAction) -> Self {
        Self {
            label: ButtonLabel::Toggle(key, on),
            action,
        }
    }

    pub fn literal(text: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: ButtonLabel::Literal(text.into()),
            action,
        }
    }
}

/// One message to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub key: &'static str,
    pub args: Vec<(&'static str, String)>,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            args: Vec::new(),
            keyboard: Vec::new(),
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl ToString) -> Self {
        self.args.push((name, value.to_string()));
        self
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.keyboard.push(buttons);
        }
        self
    }

    pub fn arg_value(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every callback action reachable from this message's keyboard
    pub fn actions(&self) -> impl Iterator<Item = &CallbackAction> {
        self.keyboard.iter().flatten().map(|button| &button.action)
    }
}

/// Message produced by one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Reply(Reply),
    /// Infrastructure failure report for the configured admin chats
    AdminAlert {
        user_id: i64,
        kind: MetaKind,
        detail: String,
    },
}

impl Outbound {
    pub fn as_reply(&self) -> Option<&Reply> {
        match self {
            Outbound::Reply(reply) => Some(reply),
            Outbound::AdminAlert { .. } => None,
        }
    }
}

impl From<Reply> for Outbound {
    fn from(reply: Reply) -> Self {
        Outbound::Reply(reply)
    }
}

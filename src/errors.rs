//! # Error Types Module
//!
//! This module defines the error types used by the dialog core.
//! Backend faults are surfaced through the recovery layer as meta-states,
//! input errors are resolved inside the current dialog state by re-prompting.

use thiserror::Error;

/// Errors returned by a backend gateway call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No response at all: timeout, refused connection, failed health probe
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// The backend answered but refused the request
    #[error("Backend rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

impl GatewayError {
    /// Short human readable detail shown back to the user
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Unavailable(msg) => msg.clone(),
            GatewayError::Rejected { status, detail } => format!("{status}: {detail}"),
        }
    }
}

/// Invalid user input inside a waiting state
///
/// Each variant maps to a localization key so the controller can re-prompt
/// without ever leaving the state it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("input is not a number")]
    NotANumber,
    #[error("number is out of range")]
    OutOfRange,
    #[error("input is empty")]
    Empty,
    #[error("input is too long")]
    TooLong,
}

impl InputError {
    pub fn message_key(&self) -> &'static str {
        match self {
            InputError::NotANumber => "error-not-a-number",
            InputError::OutOfRange => "error-out-of-range",
            InputError::Empty => "error-empty-input",
            InputError::TooLong => "error-input-too-long",
        }
    }
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

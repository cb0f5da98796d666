//! Dialogue state module: the states of the conversation and the validators
//! for free-text input received while waiting for a single field.

use serde::{Deserialize, Serialize};

use crate::errors::InputError;
use crate::word_model::HintType;

pub const MAX_HINT_LENGTH: usize = 500;

/// Infrastructure failure classes that preempt the dialog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaKind {
    ApiError,
    ConnectionLost,
    UnknownCommand,
}

/// Represents the conversation state of one user
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    #[default]
    SelectingLanguage,
    ViewingSettings,
    WaitingStartWord,
    Studying,
    ViewingWordDetails,
    ConfirmingWordKnowledge,
    ViewingWordImage,
    CreatingHint {
        hint_type: HintType,
    },
    EditingHint {
        hint_type: HintType,
    },
    Meta(MetaKind),
}

/// Groups of states sharing navigation and fallback behaviour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateFamily {
    Language,
    Settings,
    Study,
    Hint,
    Meta,
}

impl DialogState {
    pub fn family(&self) -> StateFamily {
        match self {
            DialogState::SelectingLanguage => StateFamily::Language,
            DialogState::ViewingSettings | DialogState::WaitingStartWord => StateFamily::Settings,
            DialogState::Studying
            | DialogState::ViewingWordDetails
            | DialogState::ConfirmingWordKnowledge
            | DialogState::ViewingWordImage => StateFamily::Study,
            DialogState::CreatingHint { .. } | DialogState::EditingHint { .. } => StateFamily::Hint,
            DialogState::Meta(_) => StateFamily::Meta,
        }
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, DialogState::Meta(_))
    }

    /// States that wait for one free-text field
    pub fn is_waiting_for_input(&self) -> bool {
        matches!(
            self,
            DialogState::WaitingStartWord | DialogState::CreatingHint { .. } | DialogState::EditingHint { .. }
        )
    }
}

/// Validates a start word input
pub fn validate_start_word(input: &str) -> Result<u32, InputError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    match trimmed.parse::<i64>() {
        Ok(n) if (1..=i64::from(u32::MAX)).contains(&n) => Ok(n as u32),
        Ok(_) => Err(InputError::OutOfRange),
        // Digits only but too large for i64 is still a number
        Err(_) if trimmed.chars().all(|c| c.is_ascii_digit()) => Err(InputError::OutOfRange),
        Err(_) => Err(InputError::NotANumber),
    }
}

/// Validates a hint text input
pub fn validate_hint_text(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    if trimmed.chars().count() > MAX_HINT_LENGTH {
        return Err(InputError::TooLong);
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_word_validation() {
        assert_eq!(validate_start_word("15"), Ok(15));
        assert_eq!(validate_start_word("  3 "), Ok(3));

        assert_eq!(validate_start_word(""), Err(InputError::Empty));
        assert_eq!(validate_start_word("0"), Err(InputError::OutOfRange));
        assert_eq!(validate_start_word("-4"), Err(InputError::OutOfRange));
        assert_eq!(validate_start_word("99999999999999999999999"), Err(InputError::OutOfRange));
        assert_eq!(validate_start_word("ten"), Err(InputError::NotANumber));
        assert_eq!(validate_start_word("1.5"), Err(InputError::NotANumber));
    }

    #[test]
    fn test_hint_text_validation() {
        assert_eq!(validate_hint_text("  sounds like 'house' "), Ok("sounds like 'house'".to_string()));
        assert_eq!(validate_hint_text("   "), Err(InputError::Empty));
        assert_eq!(validate_hint_text(&"a".repeat(501)), Err(InputError::TooLong));
        assert!(validate_hint_text(&"ä".repeat(500)).is_ok());
    }

    #[test]
    fn test_state_families() {
        assert_eq!(DialogState::default(), DialogState::SelectingLanguage);
        assert_eq!(DialogState::WaitingStartWord.family(), StateFamily::Settings);
        assert_eq!(DialogState::ConfirmingWordKnowledge.family(), StateFamily::Study);
        assert_eq!(
            DialogState::EditingHint {
                hint_type: HintType::Writing
            }
            .family(),
            StateFamily::Hint
        );
        assert!(DialogState::Meta(MetaKind::ConnectionLost).is_meta());
        assert!(DialogState::WaitingStartWord.is_waiting_for_input());
        assert!(!DialogState::Studying.is_waiting_for_input());
    }
}

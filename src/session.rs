//! Per-user conversation context.
//!
//! A [`Session`] is owned by exactly one user worker task and is only ever
//! borrowed inside that task.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::backend::BackendUserId;
use crate::dialogue::{DialogState, MetaKind};
use crate::scheduler::Answer;
use crate::word_model::{HintType, Language, Settings, StudyItem};

/// Last infrastructure failure seen by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaError {
    pub kind: MetaKind,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

/// Per-word study state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyContext {
    pub current_word: Option<StudyItem>,
    /// Hint types revealed for the current word; any entry marks hint usage
    pub hints_shown: BTreeSet<HintType>,
    /// "Know" was pressed and awaits confirmation
    pub pending_confirmation: bool,
    /// Answer already stored for the current word
    pub answer_recorded: Option<Answer>,
}

impl StudyContext {
    /// Start a fresh context for `item`
    pub fn for_item(item: StudyItem) -> Self {
        Self {
            current_word: Some(item),
            ..Default::default()
        }
    }

    pub fn hint_used(&self) -> bool {
        !self.hints_shown.is_empty()
    }
}

/// Conversation context of one Telegram user
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: i64,
    /// Resolved lazily on the first turn that needs the backend
    pub backend_user_id: Option<BackendUserId>,
    pub current_language: Option<Language>,
    pub is_admin: bool,
    /// Telegram interface language code used to render replies
    pub interface_language: Option<String>,
    pub state: DialogState,
    pub settings: Option<Settings>,
    pub study: StudyContext,
    /// Languages offered by the last language prompt
    pub available_languages: Vec<Language>,
    pub last_meta_error: Option<MetaError>,
}

impl Session {
    pub fn new(user_id: i64, is_admin: bool, interface_language: Option<String>) -> Self {
        Self {
            user_id,
            backend_user_id: None,
            current_language: None,
            is_admin,
            interface_language,
            state: DialogState::default(),
            settings: None,
            study: StudyContext::default(),
            available_languages: Vec::new(),
            last_meta_error: None,
        }
    }

    /// Back to the default state; language and admin flag survive
    pub fn reset(&mut self) {
        self.state = DialogState::default();
        self.settings = None;
        self.study = StudyContext::default();
        self.available_languages.clear();
        self.last_meta_error = None;
    }

    /// Enter a meta-state, keeping only the essential fields
    pub fn enter_meta(&mut self, kind: MetaKind, detail: String, occurred_at: DateTime<Utc>) {
        self.reset();
        self.state = DialogState::Meta(kind);
        self.last_meta_error = Some(MetaError {
            kind,
            detail,
            occurred_at,
        });
    }

    /// Full restart: forget the language too
    pub fn clear_all(&mut self) {
        self.reset();
        self.current_language = None;
    }

    pub fn language_id(&self) -> Option<&str> {
        self.current_language.as_ref().map(|l| l.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn german() -> Language {
        Language {
            id: "de".to_string(),
            name: "German".to_string(),
            native_name: "Deutsch".to_string(),
        }
    }

    fn item() -> StudyItem {
        StudyItem {
            word_id: 1,
            foreign_text: "Haus".to_string(),
            translation: "house".to_string(),
            transcription: None,
            word_number: 1,
            progress: Default::default(),
            hints: Default::default(),
        }
    }

    #[test]
    fn test_enter_meta_keeps_essentials() {
        let mut session = Session::new(42, true, Some("en".to_string()));
        session.backend_user_id = Some(7);
        session.current_language = Some(german());
        session.state = DialogState::ConfirmingWordKnowledge;
        session.settings = Some(Settings::default());
        session.study = StudyContext::for_item(item());
        session.study.pending_confirmation = true;

        session.enter_meta(MetaKind::ConnectionLost, "timeout".to_string(), Utc::now());

        assert_eq!(session.user_id, 42);
        assert_eq!(session.backend_user_id, Some(7));
        assert_eq!(session.current_language, Some(german()));
        assert!(session.is_admin);
        assert_eq!(session.state, DialogState::Meta(MetaKind::ConnectionLost));
        assert_eq!(session.study, StudyContext::default());
        assert!(session.settings.is_none());
        assert_eq!(session.last_meta_error.as_ref().map(|e| e.kind), Some(MetaKind::ConnectionLost));
    }

    #[test]
    fn test_reset_and_clear_all() {
        let mut session = Session::new(1, false, None);
        session.current_language = Some(german());
        session.state = DialogState::Studying;

        session.reset();
        assert_eq!(session.state, DialogState::SelectingLanguage);
        assert_eq!(session.language_id(), Some("de"));

        session.clear_all();
        assert!(session.current_language.is_none());
    }

    #[test]
    fn test_hint_usage() {
        let mut context = StudyContext::for_item(item());
        assert!(!context.hint_used());
        context.hints_shown.insert(HintType::Meaning);
        assert!(context.hint_used());
    }
}

//! # Vocabulary Data Model
//!
//! This module defines the data exchanged with the backend: study items and
//! their progress records, per-language settings and the language catalogue.
//!
//! ## Core Concepts
//!
//! - **StudyItem**: one word presented to the user, with its translation
//! - **ProgressRecord**: the scheduling state of one word for one user
//! - **Settings**: study filters and hint visibility per (user, language)
//! - **HintType**: the kinds of auxiliary clue a user can attach to a word

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of hints a user can attach to a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintType {
    Meaning,
    PhoneticAssociation,
    PhoneticSound,
    Writing,
}

impl HintType {
    pub const ALL: [HintType; 4] = [
        HintType::Meaning,
        HintType::PhoneticAssociation,
        HintType::PhoneticSound,
        HintType::Writing,
    ];

    /// Stable token used in callback data and backend paths
    pub fn as_token(&self) -> &'static str {
        match self {
            HintType::Meaning => "meaning",
            HintType::PhoneticAssociation => "phonetic_association",
            HintType::PhoneticSound => "phonetic_sound",
            HintType::Writing => "writing",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        HintType::ALL.into_iter().find(|t| t.as_token() == token)
    }

    /// Localization key of the hint type's display name
    pub fn label_key(&self) -> &'static str {
        match self {
            HintType::Meaning => "hint-type-meaning",
            HintType::PhoneticAssociation => "hint-type-phonetic-association",
            HintType::PhoneticSound => "hint-type-phonetic-sound",
            HintType::Writing => "hint-type-writing",
        }
    }
}

impl fmt::Display for HintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// A language the user can study
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    /// English display name (e.g., "German")
    pub name: String,
    /// Display name in the language itself (e.g., "Deutsch")
    pub native_name: String,
}

/// Scheduling state of one word for one user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// 0 = unknown or failed, >= 1 = depth of the current known streak
    pub score: u32,
    /// Days until the word resurfaces; 0 means never answered
    pub check_interval: u32,
    pub next_check_date: Option<NaiveDate>,
    pub is_skipped: bool,
}

impl ProgressRecord {
    /// Whether the word may be shown on `today` when check dates are honoured
    pub fn is_due(&self, today: NaiveDate) -> bool {
        match self.next_check_date {
            Some(date) => date <= today,
            None => true,
        }
    }
}

/// One word presented to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyItem {
    pub word_id: i64,
    pub foreign_text: String,
    pub translation: String,
    #[serde(default)]
    pub transcription: Option<String>,
    /// Position of the word in the language's frequency list, 1-based
    pub word_number: u32,
    #[serde(default)]
    pub progress: ProgressRecord,
    /// Hint texts the user already wrote for this word
    #[serde(default)]
    pub hints: BTreeMap<HintType, String>,
}

/// Study settings for one (user, language) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub start_word: u32,
    pub skip_marked: bool,
    pub use_check_date: bool,
    pub show_hints: bool,
    #[serde(default = "all_hints_visible")]
    pub hint_visibility: BTreeMap<HintType, bool>,
}

fn all_hints_visible() -> BTreeMap<HintType, bool> {
    HintType::ALL.into_iter().map(|t| (t, true)).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_word: 1,
            skip_marked: false,
            use_check_date: false,
            show_hints: true,
            hint_visibility: all_hints_visible(),
        }
    }
}

impl Settings {
    /// Merge a partial update; unset fields keep their previous value
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(start_word) = patch.start_word {
            self.start_word = start_word;
        }
        if let Some(skip_marked) = patch.skip_marked {
            self.skip_marked = skip_marked;
        }
        if let Some(use_check_date) = patch.use_check_date {
            self.use_check_date = use_check_date;
        }
        if let Some(show_hints) = patch.show_hints {
            self.show_hints = show_hints;
        }
        for (hint_type, visible) in &patch.hint_visibility {
            self.hint_visibility.insert(*hint_type, *visible);
        }
    }

    /// Whether buttons for `hint_type` are shown while studying
    pub fn hint_visible(&self, hint_type: HintType) -> bool {
        self.show_hints && self.hint_visibility.get(&hint_type).copied().unwrap_or(true)
    }

    /// The filter subset that determines word queue contents
    pub fn filters(&self) -> QueueFilters {
        QueueFilters {
            start_word: self.start_word,
            skip_marked: self.skip_marked,
            use_check_date: self.use_check_date,
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_word: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_marked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_check_date: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_hints: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hint_visibility: BTreeMap<HintType, bool>,
}

/// Filter parameters sent with every study item fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFilters {
    pub start_word: u32,
    pub skip_marked: bool,
    pub use_check_date: bool,
}

impl QueueFilters {
    /// Whether `item` may be served under these filters on `today`
    pub fn admits(&self, item: &StudyItem, today: NaiveDate) -> bool {
        if self.skip_marked && item.progress.is_skipped {
            return false;
        }
        if self.use_check_date && !item.progress.is_due(today) {
            return false;
        }
        true
    }
}

//! In-memory implementation of the backend gateway
//!
//! Used when no `BACKEND_URL` is configured and as the test double for the
//! dialog core. Supports fault injection: switching the backend offline and
//! rejecting a number of upcoming calls.

use chrono::{Local, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{BackendGateway, BackendUserId, GatewayResult};
use crate::errors::GatewayError;
use crate::word_model::{HintType, Language, ProgressRecord, QueueFilters, Settings, SettingsPatch, StudyItem};

/// A word of the catalogue, before per-user data is attached
#[derive(Debug, Clone)]
pub struct CatalogWord {
    pub word_id: i64,
    pub foreign_text: String,
    pub translation: String,
    pub transcription: Option<String>,
    pub word_number: u32,
}

#[derive(Debug, Default)]
struct Store {
    languages: Vec<Language>,
    words: HashMap<String, Vec<CatalogWord>>,
    users: HashMap<i64, BackendUserId>,
    settings: HashMap<(BackendUserId, String), Settings>,
    progress: HashMap<(BackendUserId, i64), ProgressRecord>,
    hints: HashMap<(BackendUserId, i64), BTreeMap<HintType, String>>,
    next_word_id: i64,
}

#[derive(Debug)]
struct Rejection {
    remaining: u32,
    status: u16,
    detail: String,
}

/// Backend keeping everything in process memory
#[derive(Debug)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
    online: AtomicBool,
    rejection: Mutex<Option<Rejection>>,
    fetch_calls: AtomicUsize,
    today: Mutex<Option<NaiveDate>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create an empty backend with no languages
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                next_word_id: 1,
                ..Default::default()
            }),
            online: AtomicBool::new(true),
            rejection: Mutex::new(None),
            fetch_calls: AtomicUsize::new(0),
            today: Mutex::new(None),
        }
    }

    /// Backend seeded with a small German and Spanish vocabulary
    pub fn demo() -> Self {
        let backend = Self::new();
        backend.add_language(
            Language {
                id: "de".to_string(),
                name: "German".to_string(),
                native_name: "Deutsch".to_string(),
            },
            &[
                ("der", "the", Some("deːɐ̯")),
                ("und", "and", Some("ʊnt")),
                ("sein", "to be", Some("zaɪ̯n")),
                ("haben", "to have", Some("ˈhaːbn̩")),
                ("Haus", "house", Some("haʊ̯s")),
                ("Zeit", "time", Some("t͡saɪ̯t")),
                ("Jahr", "year", Some("jaːɐ̯")),
                ("Wasser", "water", Some("ˈvasɐ")),
                ("Freund", "friend", Some("fʁɔɪ̯nt")),
                ("Buch", "book", Some("buːx")),
            ],
        );
        backend.add_language(
            Language {
                id: "es".to_string(),
                name: "Spanish".to_string(),
                native_name: "Español".to_string(),
            },
            &[
                ("casa", "house", None),
                ("tiempo", "time", None),
                ("agua", "water", None),
                ("amigo", "friend", None),
                ("libro", "book", None),
            ],
        );
        backend
    }

    /// Register a language with its words, numbered in the given order
    pub fn add_language(&self, language: Language, words: &[(&str, &str, Option<&str>)]) {
        let mut store = self.lock_store();
        let mut catalog = Vec::with_capacity(words.len());
        for (index, (foreign, translation, transcription)) in words.iter().enumerate() {
            let word_id = store.next_word_id;
            store.next_word_id += 1;
            catalog.push(CatalogWord {
                word_id,
                foreign_text: foreign.to_string(),
                translation: translation.to_string(),
                transcription: transcription.map(str::to_string),
                word_number: index as u32 + 1,
            });
        }
        store.words.insert(language.id.clone(), catalog);
        store.languages.push(language);
    }

    /// Simulate network loss (`false`) or recovery (`true`)
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Reject the next `count` non-health calls with `status`
    pub fn reject_next(&self, count: u32, status: u16, detail: &str) {
        *self.lock_rejection() = Some(Rejection {
            remaining: count,
            status,
            detail: detail.to_string(),
        });
    }

    /// Pin the date used for check-date filtering
    pub fn set_today(&self, today: NaiveDate) {
        if let Ok(mut guard) = self.today.lock() {
            *guard = Some(today);
        }
    }

    /// Number of `fetch_study_items` calls that reached the store
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Directly overwrite progress, bypassing fault injection
    pub fn seed_progress(&self, user_id: BackendUserId, word_id: i64, record: ProgressRecord) {
        self.lock_store().progress.insert((user_id, word_id), record);
    }

    /// Stored progress, bypassing fault injection
    pub fn stored_progress(&self, user_id: BackendUserId, word_id: i64) -> Option<ProgressRecord> {
        self.lock_store().progress.get(&(user_id, word_id)).cloned()
    }

    /// Stored hint text, bypassing fault injection
    pub fn stored_hint(&self, user_id: BackendUserId, word_id: i64, hint_type: HintType) -> Option<String> {
        self.lock_store()
            .hints
            .get(&(user_id, word_id))
            .and_then(|hints| hints.get(&hint_type).cloned())
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, Store> {
        // A poisoned store only means a test panicked mid-call; the data is still usable
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_rejection(&self) -> std::sync::MutexGuard<'_, Option<Rejection>> {
        self.rejection.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.today
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn check_online(&self) -> GatewayResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }
    }

    /// Gate for every data operation: connectivity first, then injected rejections
    fn gate(&self) -> GatewayResult<()> {
        self.check_online()?;
        let mut rejection = self.lock_rejection();
        if let Some(active) = rejection.as_mut() {
            if active.remaining > 0 {
                active.remaining -= 1;
                let err = GatewayError::Rejected {
                    status: active.status,
                    detail: active.detail.clone(),
                };
                if active.remaining == 0 {
                    *rejection = None;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn known_language(store: &Store, language_id: &str) -> GatewayResult<()> {
        if store.words.contains_key(language_id) {
            Ok(())
        } else {
            Err(GatewayError::Rejected {
                status: 404,
                detail: format!("unknown language {language_id}"),
            })
        }
    }
}

impl BackendGateway for InMemoryBackend {
    async fn health_check(&self) -> GatewayResult<()> {
        self.check_online()
    }

    async fn resolve_user(&self, telegram_id: i64) -> GatewayResult<BackendUserId> {
        self.gate()?;
        let mut store = self.lock_store();
        let next_id = store.users.len() as BackendUserId + 1;
        Ok(*store.users.entry(telegram_id).or_insert(next_id))
    }

    async fn list_languages(&self) -> GatewayResult<Vec<Language>> {
        self.gate()?;
        Ok(self.lock_store().languages.clone())
    }

    async fn fetch_study_items(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        filters: QueueFilters,
        page_size: usize,
    ) -> GatewayResult<Vec<StudyItem>> {
        self.gate()?;
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let today = self.today();
        let store = self.lock_store();
        Self::known_language(&store, language_id)?;

        let words = store.words.get(language_id).map(Vec::as_slice).unwrap_or_default();
        let page = words
            .iter()
            .filter(|w| w.word_number >= filters.start_word)
            .map(|w| StudyItem {
                word_id: w.word_id,
                foreign_text: w.foreign_text.clone(),
                translation: w.translation.clone(),
                transcription: w.transcription.clone(),
                word_number: w.word_number,
                progress: store
                    .progress
                    .get(&(user_id, w.word_id))
                    .cloned()
                    .unwrap_or_default(),
                hints: store.hints.get(&(user_id, w.word_id)).cloned().unwrap_or_default(),
            })
            .filter(|item| filters.admits(item, today))
            .take(page_size)
            .collect();
        Ok(page)
    }

    async fn get_settings(&self, user_id: BackendUserId, language_id: &str) -> GatewayResult<Settings> {
        self.gate()?;
        let mut store = self.lock_store();
        Self::known_language(&store, language_id)?;
        Ok(store
            .settings
            .entry((user_id, language_id.to_string()))
            .or_default()
            .clone())
    }

    async fn put_settings(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        patch: &SettingsPatch,
    ) -> GatewayResult<Settings> {
        self.gate()?;
        if patch.start_word == Some(0) {
            return Err(GatewayError::Rejected {
                status: 422,
                detail: "start_word must be at least 1".to_string(),
            });
        }
        let mut store = self.lock_store();
        Self::known_language(&store, language_id)?;
        let settings = store
            .settings
            .entry((user_id, language_id.to_string()))
            .or_default();
        settings.merge(patch);
        Ok(settings.clone())
    }

    async fn get_progress(&self, user_id: BackendUserId, word_id: i64) -> GatewayResult<Option<ProgressRecord>> {
        self.gate()?;
        Ok(self.lock_store().progress.get(&(user_id, word_id)).cloned())
    }

    async fn put_progress(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        record: &ProgressRecord,
    ) -> GatewayResult<ProgressRecord> {
        self.gate()?;
        self.lock_store().progress.insert((user_id, word_id), record.clone());
        Ok(record.clone())
    }

    async fn put_hint(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        hint_type: HintType,
        text: &str,
    ) -> GatewayResult<()> {
        self.gate()?;
        self.lock_store()
            .hints
            .entry((user_id, word_id))
            .or_default()
            .insert(hint_type, text.to_string());
        Ok(())
    }
}

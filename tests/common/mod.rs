//! Shared harness for driving the session engine against the in-memory backend

#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;

use lexicon_bot::backend::InMemoryBackend;
use lexicon_bot::config::{AppConfig, RecoveryConfig};
use lexicon_bot::fsm::{CallbackAction, Outbound, RawEvent, Reply, SessionEngine};
use lexicon_bot::session::Session;
use lexicon_bot::word_queue::WordQueue;

pub const USER_ID: i64 = 1001;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
}

/// Configuration with instant probe retries
pub fn test_config() -> AppConfig {
    AppConfig {
        recovery: RecoveryConfig {
            max_probes: 2,
            base_probe_delay_ms: 0,
            max_probe_delay_ms: 0,
            probe_before_dispatch: true,
        },
        ..Default::default()
    }
}

pub struct Harness {
    pub backend: Arc<InMemoryBackend>,
    pub engine: SessionEngine<InMemoryBackend>,
    pub session: Session,
    pub queue: Option<WordQueue>,
    pub today: NaiveDate,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::demo());
        backend.set_today(today());
        Self {
            engine: SessionEngine::new(Arc::clone(&backend), &config),
            backend,
            session: Session::new(USER_ID, false, Some("en".to_string())),
            queue: None,
            today: today(),
        }
    }

    pub async fn send(&mut self, raw: RawEvent) -> Vec<Outbound> {
        self.engine
            .handle(&mut self.session, &mut self.queue, raw, self.today)
            .await
    }

    pub async fn text(&mut self, text: &str) -> Vec<Outbound> {
        self.send(RawEvent::from_text(text)).await
    }

    pub async fn press(&mut self, action: CallbackAction) -> Vec<Outbound> {
        self.send(RawEvent::Callback(action.token())).await
    }

    /// `/start` and pick `language_id`
    pub async fn start_with_language(&mut self, language_id: &str) -> Vec<Outbound> {
        self.text("/start").await;
        self.press(CallbackAction::SelectLanguage(language_id.to_string())).await
    }

    pub fn backend_user(&self) -> i64 {
        self.session.backend_user_id.expect("backend user resolved")
    }

    pub fn current_word(&self) -> Option<String> {
        self.session
            .study
            .current_word
            .as_ref()
            .map(|item| item.foreign_text.clone())
    }

    pub fn current_word_id(&self) -> i64 {
        self.session
            .study
            .current_word
            .as_ref()
            .map(|item| item.word_id)
            .expect("a word is being studied")
    }
}

pub fn keys(outbound: &[Outbound]) -> Vec<&'static str> {
    outbound.iter().filter_map(Outbound::as_reply).map(|r| r.key).collect()
}

pub fn find<'a>(outbound: &'a [Outbound], key: &str) -> Option<&'a Reply> {
    outbound.iter().filter_map(Outbound::as_reply).find(|r| r.key == key)
}

pub fn offers(outbound: &[Outbound], action: &CallbackAction) -> bool {
    outbound
        .iter()
        .filter_map(Outbound::as_reply)
        .any(|reply| reply.actions().any(|a| a == action))
}

pub fn admin_alerts(outbound: &[Outbound]) -> usize {
    outbound
        .iter()
        .filter(|o| matches!(o, Outbound::AdminAlert { .. }))
        .count()
}

//! # Recovery Tests
//!
//! Meta-state entry on backend faults, the retry/reset protocol and the
//! preemption property: once a meta-state is active no dialog handler runs
//! until it is cleared.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{admin_alerts, find, keys, test_config, today, Harness};
use lexicon_bot::backend::{BackendGateway, BackendUserId, GatewayResult, InMemoryBackend};
use lexicon_bot::dialogue::{DialogState, MetaKind};
use lexicon_bot::errors::GatewayError;
use lexicon_bot::fsm::{CallbackAction, RawEvent, SessionEngine};
use lexicon_bot::session::Session;
use lexicon_bot::word_model::{
    HintType, Language, ProgressRecord, QueueFilters, Settings, SettingsPatch, StudyItem,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn harness_without_preflight() -> Harness {
    let mut config = test_config();
    config.recovery.probe_before_dispatch = false;
    Harness::with_config(config)
}

#[tokio::test]
async fn test_fetch_failure_mid_session_enters_connection_lost() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    let backend_user = h.session.backend_user_id;

    h.backend.set_online(false);
    let replies = h.press(CallbackAction::StartStudy).await;

    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));
    assert_eq!(keys(&replies), vec!["meta-connection-lost"]);
    assert_eq!(admin_alerts(&replies), 1);

    // Essentials survive, study context is gone
    assert_eq!(h.session.user_id, common::USER_ID);
    assert_eq!(h.session.backend_user_id, backend_user);
    assert_eq!(h.session.language_id(), Some("de"));
    assert!(h.session.study.current_word.is_none());
    assert!(h.queue.is_none());
    let error = h.session.last_meta_error.as_ref().expect("meta error recorded");
    assert_eq!(error.kind, MetaKind::ConnectionLost);

    h.backend.set_online(true);
    let replies = h.text("/retry").await;
    assert_eq!(keys(&replies), vec!["meta-recovered", "settings-overview"]);
    assert_eq!(h.session.state, DialogState::ViewingSettings);
    assert!(h.session.last_meta_error.is_none());
    assert_eq!(h.session.language_id(), Some("de"));
}

#[tokio::test]
async fn test_preflight_probe_detects_outage() {
    let mut h = Harness::new();
    h.start_with_language("de").await;
    h.press(CallbackAction::StartStudy).await;

    h.backend.set_online(false);
    let replies = h.press(CallbackAction::Know).await;
    assert_eq!(keys(&replies), vec!["meta-connection-lost"]);
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));
    assert!(!h.session.study.pending_confirmation);
}

#[tokio::test]
async fn test_rejected_write_enters_api_error() {
    let mut h = Harness::new();
    h.start_with_language("de").await;
    h.press(CallbackAction::StartStudy).await;

    h.backend.reject_next(1, 500, "database is read-only");
    let replies = h.press(CallbackAction::DontKnow).await;

    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ApiError));
    let reply = find(&replies, "meta-api-error").expect("api error explained");
    let detail = reply.arg_value("detail").unwrap_or_default();
    assert!(detail.contains("500"));
    assert!(detail.contains("read-only"));
    assert!(common::offers(&replies, &CallbackAction::MetaRetry));
    assert!(common::offers(&replies, &CallbackAction::MetaReset));
    assert_eq!(admin_alerts(&replies), 1);
}

#[tokio::test]
async fn test_other_input_gets_contextual_help() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.backend.set_online(false);
    h.press(CallbackAction::StartStudy).await;

    for event in [
        RawEvent::from_text("hello"),
        RawEvent::from_text("/settings"),
        RawEvent::from_text("/cancel"),
        RawEvent::Callback(CallbackAction::Know.token()),
    ] {
        let replies = h.send(event).await;
        assert_eq!(keys(&replies), vec!["meta-help"]);
        assert_eq!(
            find(&replies, "meta-help").and_then(|r| r.arg_value("detail")),
            Some("connection refused")
        );
        assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));
    }
}

#[tokio::test]
async fn test_retry_while_still_down_stays_in_meta() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.backend.set_online(false);
    h.press(CallbackAction::StartStudy).await;

    let replies = h.press(CallbackAction::MetaRetry).await;
    assert_eq!(keys(&replies), vec!["meta-still-down"]);
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));
    assert!(h.session.last_meta_error.is_some());
}

#[tokio::test]
async fn test_start_in_meta_state_keeps_language() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    let backend_user = h.session.backend_user_id;
    h.backend.reject_next(1, 503, "maintenance");
    h.press(CallbackAction::StartStudy).await;
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ApiError));

    let replies = h.text("/start").await;
    assert_eq!(keys(&replies), vec!["welcome-back", "settings-overview"]);
    assert_eq!(h.session.state, DialogState::ViewingSettings);
    assert_eq!(h.session.language_id(), Some("de"));
    assert_eq!(h.session.backend_user_id, backend_user);
    assert!(h.session.last_meta_error.is_none());
}

#[tokio::test]
async fn test_start_after_outage_keeps_language() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.backend.set_online(false);
    h.press(CallbackAction::StartStudy).await;
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));

    h.backend.set_online(true);
    h.text("/start").await;
    assert_eq!(h.session.state, DialogState::ViewingSettings);
    assert_eq!(h.session.language_id(), Some("de"));
}

#[tokio::test]
async fn test_reset_forgets_language() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.backend.reject_next(1, 503, "maintenance");
    h.press(CallbackAction::StartStudy).await;
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ApiError));

    let replies = h.text("/reset").await;
    assert_eq!(keys(&replies), vec!["welcome", "language-prompt"]);
    assert_eq!(h.session.state, DialogState::SelectingLanguage);
    assert!(h.session.current_language.is_none());
    assert!(h.session.last_meta_error.is_none());
}

#[tokio::test]
async fn test_reset_during_outage_reenters_meta() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.backend.set_online(false);
    h.press(CallbackAction::StartStudy).await;

    let replies = h.press(CallbackAction::MetaReset).await;
    assert_eq!(keys(&replies), vec!["meta-connection-lost"]);
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));
    assert!(h.session.current_language.is_none());
}

#[tokio::test]
async fn test_input_errors_never_enter_meta() {
    let mut h = Harness::new();
    h.start_with_language("de").await;
    h.press(CallbackAction::EditStartWord).await;

    for input in ["", "abc", "-1", "99999999999999999999999"] {
        h.text(input).await;
        assert_eq!(h.session.state, DialogState::WaitingStartWord);
    }
}

/// Random event drawn from everything a user can send
fn random_event(rng: &mut StdRng) -> RawEvent {
    const TEXTS: [&str; 6] = ["/start", "/cancel", "/study", "/help", "/settings", "hello"];
    let actions = [
        CallbackAction::Know,
        CallbackAction::DontKnow,
        CallbackAction::Confirm,
        CallbackAction::Next,
        CallbackAction::StartStudy,
        CallbackAction::ShowHint(HintType::Meaning),
        CallbackAction::SelectLanguage("de".to_string()),
        CallbackAction::MetaRetry,
        CallbackAction::MetaReset,
    ];
    if rng.gen_bool(0.5) {
        RawEvent::from_text(TEXTS[rng.gen_range(0..TEXTS.len())])
    } else {
        RawEvent::Callback(actions[rng.gen_range(0..actions.len())].token())
    }
}

#[tokio::test]
async fn test_meta_state_claims_every_event_while_backend_is_down() {
    let allowed = ["meta-help", "meta-still-down", "meta-connection-lost"];

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut h = harness_without_preflight();
        h.start_with_language("de").await;
        h.backend.set_online(false);
        h.press(CallbackAction::StartStudy).await;

        for step in 0..40 {
            let event = random_event(&mut rng);
            let replies = h.send(event.clone()).await;
            assert!(
                h.session.state.is_meta(),
                "seed {seed} step {step}: {event:?} left the meta-state"
            );
            for key in keys(&replies) {
                assert!(allowed.contains(&key), "seed {seed} step {step}: {event:?} produced {key}");
            }
        }
    }
}

#[tokio::test]
async fn test_meta_state_is_sticky_until_cleared() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.text("/nonsense").await;
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::UnknownCommand));

    // Anything but retry/reset keeps the session where it is
    for _ in 0..30 {
        let event = random_event(&mut rng);
        let clears = matches!(
            &event,
            RawEvent::Command { name, .. } if name == "start"
        ) || matches!(
            &event,
            RawEvent::Callback(data) if data == "meta:retry" || data == "meta:reset"
        );
        h.send(event).await;
        if clears {
            assert!(!h.session.state.is_meta());
            return;
        }
        assert_eq!(h.session.state, DialogState::Meta(MetaKind::UnknownCommand));
    }
}

/// Backend whose health endpoint answers with an HTTP error while `failing`
struct MaintenanceBackend {
    inner: InMemoryBackend,
    failing: AtomicBool,
}

impl BackendGateway for MaintenanceBackend {
    async fn health_check(&self) -> GatewayResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 503,
                detail: "maintenance window".to_string(),
            });
        }
        self.inner.health_check().await
    }

    async fn resolve_user(&self, telegram_id: i64) -> GatewayResult<BackendUserId> {
        self.inner.resolve_user(telegram_id).await
    }

    async fn list_languages(&self) -> GatewayResult<Vec<Language>> {
        self.inner.list_languages().await
    }

    async fn fetch_study_items(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        filters: QueueFilters,
        page_size: usize,
    ) -> GatewayResult<Vec<StudyItem>> {
        self.inner
            .fetch_study_items(user_id, language_id, filters, page_size)
            .await
    }

    async fn get_settings(&self, user_id: BackendUserId, language_id: &str) -> GatewayResult<Settings> {
        self.inner.get_settings(user_id, language_id).await
    }

    async fn put_settings(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        patch: &SettingsPatch,
    ) -> GatewayResult<Settings> {
        self.inner.put_settings(user_id, language_id, patch).await
    }

    async fn get_progress(&self, user_id: BackendUserId, word_id: i64) -> GatewayResult<Option<ProgressRecord>> {
        self.inner.get_progress(user_id, word_id).await
    }

    async fn put_progress(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        record: &ProgressRecord,
    ) -> GatewayResult<ProgressRecord> {
        self.inner.put_progress(user_id, word_id, record).await
    }

    async fn put_hint(&self, user_id: BackendUserId, word_id: i64, hint_type: HintType, text: &str) -> GatewayResult<()> {
        self.inner.put_hint(user_id, word_id, hint_type, text).await
    }
}

#[tokio::test]
async fn test_failed_health_check_with_http_status_is_connection_lost() {
    let backend = Arc::new(MaintenanceBackend {
        inner: InMemoryBackend::demo(),
        failing: AtomicBool::new(true),
    });
    let engine = SessionEngine::new(Arc::clone(&backend), &test_config());
    let mut session = Session::new(common::USER_ID, false, None);
    let mut queue = None;

    let replies = engine
        .handle(&mut session, &mut queue, RawEvent::from_text("/start"), today())
        .await;
    assert_eq!(session.state, DialogState::Meta(MetaKind::ConnectionLost));
    assert_eq!(keys(&replies), vec!["meta-connection-lost"]);
    assert_eq!(admin_alerts(&replies), 1);
    let error = session.last_meta_error.as_ref().expect("meta error recorded");
    assert_eq!(error.kind, MetaKind::ConnectionLost);
    assert!(error.detail.contains("503"));
    assert!(error.detail.contains("maintenance window"));

    // Retrying while the health endpoint still refuses stays in ConnectionLost
    let replies = engine
        .handle(&mut session, &mut queue, RawEvent::from_text("/retry"), today())
        .await;
    assert_eq!(keys(&replies), vec!["meta-still-down"]);
    assert_eq!(session.state, DialogState::Meta(MetaKind::ConnectionLost));

    backend.failing.store(false, Ordering::SeqCst);
    let replies = engine
        .handle(&mut session, &mut queue, RawEvent::from_text("/retry"), today())
        .await;
    assert_eq!(keys(&replies), vec!["meta-recovered", "language-prompt"]);
    assert_eq!(session.state, DialogState::SelectingLanguage);
}

#[tokio::test]
async fn test_failed_retry_from_api_error_switches_to_connection_lost() {
    let mut h = harness_without_preflight();
    h.start_with_language("de").await;
    h.backend.reject_next(1, 500, "internal error");
    h.press(CallbackAction::StartStudy).await;
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ApiError));

    h.backend.set_online(false);
    let replies = h.text("/retry").await;
    assert_eq!(keys(&replies), vec!["meta-still-down"]);
    assert_eq!(h.session.state, DialogState::Meta(MetaKind::ConnectionLost));
    assert_eq!(h.session.language_id(), Some("de"));
}

//! Meta-state recovery layer.
//!
//! Backend faults are classified into meta-states here. While a session sits
//! in a meta-state only retry (probe the backend and return to idle), reset
//! (forget everything and start over) and `/start` (restart, keeping the
//! language) do anything. Everything else gets a contextual help message
//! carrying the original error.
//!
//! A failed health check always means `ConnectionLost`, whatever the
//! gateway reported.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{error, info, warn};

use crate::backend::BackendGateway;
use crate::config::RecoveryConfig;
use crate::dialogue::MetaKind;
use crate::errors::GatewayError;
use crate::fsm::controller::{Controller, Turn};
use crate::fsm::event::{CallbackAction, Command, Event};
use crate::fsm::outbound::{Button, Outbound, Reply};
use crate::fsm::routing::Route;

/// Meta-state a backend fault maps to
pub fn classify_fault(err: &GatewayError) -> MetaKind {
    match err {
        GatewayError::Unavailable(_) => MetaKind::ConnectionLost,
        GatewayError::Rejected { .. } => MetaKind::ApiError,
    }
}

/// What an event means while a meta-state is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaInput {
    Retry,
    Reset,
    Restart,
    Other,
}

impl MetaInput {
    pub fn of(event: &Event) -> Self {
        match event {
            Event::Command {
                command: Command::Retry, ..
            }
            | Event::Callback(CallbackAction::MetaRetry) => MetaInput::Retry,
            Event::Command {
                command: Command::Reset, ..
            }
            | Event::Callback(CallbackAction::MetaReset) => MetaInput::Reset,
            Event::Command {
                command: Command::Start, ..
            } => MetaInput::Restart,
            _ => MetaInput::Other,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryManager {
    config: RecoveryConfig,
}

impl RecoveryManager {
    pub fn new(config: RecoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Force the session into a meta-state and describe the way out
    pub fn enter<B>(&self, turn: &mut Turn<'_, B>, kind: MetaKind, detail: String, now: DateTime<Utc>) -> Vec<Outbound> {
        let user_id = turn.session.user_id;
        match kind {
            MetaKind::UnknownCommand => {
                warn!(user_id, detail = %detail, "Unknown command, entering meta-state")
            }
            _ => error!(user_id, kind = ?kind, detail = %detail, "Backend fault, entering meta-state"),
        }

        *turn.queue = None;
        turn.session.enter_meta(kind, detail.clone(), now);

        let mut replies = vec![meta_help(kind, &detail, false).into()];
        if kind != MetaKind::UnknownCommand {
            replies.push(Outbound::AdminAlert { user_id, kind, detail });
        }
        replies
    }

    /// Enter the meta-state matching a backend fault
    pub fn enter_fault<B>(&self, turn: &mut Turn<'_, B>, err: &GatewayError, now: DateTime<Utc>) -> Vec<Outbound> {
        self.enter(turn, classify_fault(err), err.detail(), now)
    }

    /// Handle one event while `kind` is active
    pub async fn handle<B: BackendGateway>(
        &self,
        controller: &Controller,
        turn: &mut Turn<'_, B>,
        kind: MetaKind,
        event: &Event,
        now: DateTime<Utc>,
    ) -> Vec<Outbound> {
        match MetaInput::of(event) {
            MetaInput::Retry => self.retry(controller, turn, kind, now).await,
            MetaInput::Reset => self.reset(controller, turn, now).await,
            MetaInput::Restart => self.restart(controller, turn, now).await,
            MetaInput::Other => {
                let detail = turn
                    .session
                    .last_meta_error
                    .as_ref()
                    .map(|e| e.detail.clone())
                    .unwrap_or_default();
                vec![meta_help(kind, &detail, true).into()]
            }
        }
    }

    async fn retry<B: BackendGateway>(
        &self,
        controller: &Controller,
        turn: &mut Turn<'_, B>,
        kind: MetaKind,
        now: DateTime<Utc>,
    ) -> Vec<Outbound> {
        let user_id = turn.session.user_id;
        if kind != MetaKind::UnknownCommand {
            if let Err(e) = self.probe(turn.backend).await {
                warn!(user_id, error = %e, "Backend still unavailable after retry");
                turn.session.enter_meta(MetaKind::ConnectionLost, e.detail(), now);
                return vec![Reply::new("meta-still-down")
                    .arg("detail", e.detail())
                    .row(meta_buttons())
                    .into()];
            }
        }

        info!(user_id, kind = ?kind, "Recovered from meta-state");
        turn.session.reset();
        match controller.restore_idle(turn).await {
            Ok(mut replies) => {
                replies.insert(0, Reply::new("meta-recovered").into());
                replies
            }
            Err(e) => self.enter_fault(turn, &e, now),
        }
    }

    async fn reset<B: BackendGateway>(
        &self,
        controller: &Controller,
        turn: &mut Turn<'_, B>,
        now: DateTime<Utc>,
    ) -> Vec<Outbound> {
        info!(user_id = turn.session.user_id, "Session reset from meta-state");
        turn.session.clear_all();
        match controller.start_over(turn).await {
            Ok(replies) => replies,
            Err(e) => self.enter_fault(turn, &e, now),
        }
    }

    /// `/start` inside a meta-state: the regular restart, language kept
    async fn restart<B: BackendGateway>(
        &self,
        controller: &Controller,
        turn: &mut Turn<'_, B>,
        now: DateTime<Utc>,
    ) -> Vec<Outbound> {
        info!(user_id = turn.session.user_id, "Session restarted from meta-state");
        match controller.apply(turn, Route::Start).await {
            Ok(replies) => replies,
            Err(e) => self.enter_fault(turn, &e, now),
        }
    }

    /// Single health probe before routing an event
    pub async fn check<B: BackendGateway>(&self, backend: &B) -> Result<(), GatewayError> {
        if !self.config.probe_before_dispatch {
            return Ok(());
        }
        backend.health_check().await
    }

    /// Run [`check`](Self::check); a failure enters `ConnectionLost` with the
    /// gateway's detail and returns the replies for it
    pub async fn preflight<B: BackendGateway>(
        &self,
        turn: &mut Turn<'_, B>,
        now: DateTime<Utc>,
    ) -> Option<Vec<Outbound>> {
        match self.check(turn.backend).await {
            Ok(()) => None,
            Err(e) => Some(self.enter(turn, MetaKind::ConnectionLost, e.detail(), now)),
        }
    }

    /// Bounded health probing with exponential backoff and jitter
    pub async fn probe<B: BackendGateway>(&self, backend: &B) -> Result<(), GatewayError> {
        let attempts = self.config.max_probes.max(1);
        let mut last_error = GatewayError::Unavailable("health check not attempted".to_string());

        for attempt in 1..=attempts {
            match backend.health_check().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, max_probes = attempts, error = %e, "Health probe failed");
                    last_error = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.probe_delay(attempt)).await;
            }
        }
        Err(last_error)
    }

    /// Delay after failed probe number `attempt` (1-based)
    pub fn probe_delay(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
        let base = self
            .config
            .base_probe_delay_ms
            .saturating_mul(exp)
            .min(self.config.max_probe_delay_ms);
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter).min(self.config.max_probe_delay_ms))
    }
}

fn meta_buttons() -> Vec<Button> {
    vec![
        Button::key("button-retry", CallbackAction::MetaRetry),
        Button::key("button-reset", CallbackAction::MetaReset),
    ]
}

fn meta_help(kind: MetaKind, detail: &str, reminder: bool) -> Reply {
    let key = match (kind, reminder) {
        (MetaKind::ApiError, false) => "meta-api-error",
        (MetaKind::ConnectionLost, false) => "meta-connection-lost",
        (MetaKind::UnknownCommand, false) => "meta-unknown-command",
        (_, true) => "meta-help",
    };
    Reply::new(key).arg("detail", detail).row(meta_buttons())
}

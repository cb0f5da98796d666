//! One complete turn: guard, health probe, routing, handler, fault capture.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::backend::BackendGateway;
use crate::config::AppConfig;
use crate::dialogue::MetaKind;
use crate::fsm::controller::{Controller, Turn};
use crate::fsm::event::{Event, RawEvent};
use crate::fsm::outbound::Outbound;
use crate::fsm::recovery::RecoveryManager;
use crate::fsm::routing::{classify, Dispatch};
use crate::session::Session;
use crate::word_queue::WordQueue;

/// Session engine shared by all user workers
pub struct SessionEngine<B> {
    backend: Arc<B>,
    controller: Controller,
    recovery: RecoveryManager,
}

impl<B: BackendGateway> SessionEngine<B> {
    pub fn new(backend: Arc<B>, config: &AppConfig) -> Self {
        Self {
            backend,
            controller: Controller::new(config.scheduler.clone(), config.queue.clone()),
            recovery: RecoveryManager::new(config.recovery.clone()),
        }
    }

    /// Process one inbound event for `session`
    ///
    /// Never fails: backend faults end up as meta-state replies.
    pub async fn handle(
        &self,
        session: &mut Session,
        queue: &mut Option<WordQueue>,
        raw: RawEvent,
        today: NaiveDate,
    ) -> Vec<Outbound> {
        let event = Event::parse(raw);
        let dispatch = classify(&session.state, &event);
        debug!(user_id = session.user_id, dispatch = ?dispatch, "Event classified");

        let mut turn = Turn {
            backend: self.backend.as_ref(),
            session,
            queue,
            today,
        };

        match dispatch {
            Dispatch::Meta(kind) => {
                self.recovery
                    .handle(&self.controller, &mut turn, kind, &event, Utc::now())
                    .await
            }
            Dispatch::UnknownCommand(name) => {
                self.recovery
                    .enter(&mut turn, MetaKind::UnknownCommand, format!("/{name}"), Utc::now())
            }
            Dispatch::Dialog(route) => {
                if let Some(replies) = self.recovery.preflight(&mut turn, Utc::now()).await {
                    return replies;
                }
                match self.controller.apply(&mut turn, route).await {
                    Ok(replies) => replies,
                    Err(e) => self.recovery.enter_fault(&mut turn, &e, Utc::now()),
                }
            }
        }
    }
}

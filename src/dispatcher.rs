//! Per-user actors.
//!
//! Every Telegram user gets one worker task that owns the user's [`Session`]
//! and word queue. Events for the same user are processed strictly in arrival
//! order; workers of different users run independently, so a slow backend
//! fetch for one user never holds up another.
//!
//! A worker that sees no event for the idle timeout stops and parks its
//! session; the next event for that user resumes it in a new worker. The
//! word queue is not parked and is fetched again on demand.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info};

use crate::backend::BackendGateway;
use crate::config::DEFAULT_SESSION_IDLE_TIMEOUT_SECS;
use crate::fsm::{Outbound, RawEvent, SessionEngine};
use crate::session::Session;
use crate::word_queue::WordQueue;

const WORKER_QUEUE_CAPACITY: usize = 32;

/// Source of "today" for scheduling and due-date filtering
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

struct Job {
    event: RawEvent,
    language_code: Option<String>,
    reply: oneshot::Sender<Vec<Outbound>>,
}

/// Live workers and the sessions of users whose worker went idle
#[derive(Default)]
struct Registry {
    workers: HashMap<i64, mpsc::Sender<Job>>,
    parked: HashMap<i64, Session>,
}

/// Everything a worker task needs besides its own session
struct WorkerContext<B> {
    engine: Arc<SessionEngine<B>>,
    clock: Clock,
    registry: Arc<Mutex<Registry>>,
    idle_timeout: Duration,
}

/// Routes inbound events to per-user workers
pub struct SessionDispatcher<B> {
    engine: Arc<SessionEngine<B>>,
    admins: Arc<HashSet<i64>>,
    clock: Clock,
    idle_timeout: Duration,
    registry: Arc<Mutex<Registry>>,
}

impl<B: BackendGateway> SessionDispatcher<B> {
    pub fn new(engine: SessionEngine<B>, admin_ids: &[i64]) -> Self {
        Self::with_clock(engine, admin_ids, Arc::new(|| Local::now().date_naive()))
    }

    pub fn with_clock(engine: SessionEngine<B>, admin_ids: &[i64], clock: Clock) -> Self {
        Self {
            engine: Arc::new(engine),
            admins: Arc::new(admin_ids.iter().copied().collect()),
            clock,
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_TIMEOUT_SECS),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Stop workers that saw no event for `idle_timeout`
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Chats receiving infrastructure alerts
    pub fn admin_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.admins.iter().copied()
    }

    /// Number of running worker tasks
    pub async fn active_sessions(&self) -> usize {
        self.registry.lock().await.workers.len()
    }

    /// Number of sessions waiting for their user to come back
    pub async fn parked_sessions(&self) -> usize {
        self.registry.lock().await.parked.len()
    }

    /// Process one event for `user_id` and return the replies in order
    pub async fn on_event(&self, user_id: i64, language_code: Option<String>, event: RawEvent) -> Vec<Outbound> {
        let (tx, rx) = oneshot::channel();
        let mut job = Job {
            event,
            language_code,
            reply: tx,
        };

        // A worker that stopped in the meantime is replaced once
        for _ in 0..2 {
            let sender = self.worker(user_id).await;
            match sender.send(job).await {
                Ok(()) => {
                    return rx.await.unwrap_or_else(|_| {
                        error!(user_id, "Session worker dropped the reply");
                        Vec::new()
                    })
                }
                Err(mpsc::error::SendError(returned)) => {
                    debug!(user_id, "Session worker is gone, resending");
                    job = returned;
                }
            }
        }
        error!(user_id, "No session worker accepted the event");
        Vec::new()
    }

    async fn worker(&self, user_id: i64) -> mpsc::Sender<Job> {
        let mut registry = self.registry.lock().await;
        if let Some(sender) = registry.workers.get(&user_id) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }

        let (tx, rx) = mpsc::channel(WORKER_QUEUE_CAPACITY);
        let session = match registry.parked.remove(&user_id) {
            Some(session) => {
                info!(user_id, "Resuming parked session");
                session
            }
            None => Session::new(user_id, self.is_admin(user_id), None),
        };
        let context = WorkerContext {
            engine: Arc::clone(&self.engine),
            clock: Arc::clone(&self.clock),
            registry: Arc::clone(&self.registry),
            idle_timeout: self.idle_timeout,
        };
        tokio::spawn(run_worker(context, session, rx));
        registry.workers.insert(user_id, tx.clone());
        info!(user_id, active = registry.workers.len(), "Session worker started");
        tx
    }
}

async fn run_worker<B: BackendGateway>(
    context: WorkerContext<B>,
    mut session: Session,
    mut jobs: mpsc::Receiver<Job>,
) {
    let user_id = session.user_id;
    let mut queue: Option<WordQueue> = None;
    loop {
        let job = match tokio::time::timeout(context.idle_timeout, jobs.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => {
                // Eviction and parking happen under the registry lock, so a
                // respawn for this user always finds the parked session
                let mut registry = context.registry.lock().await;
                jobs.close();
                let mut pending = Vec::new();
                while let Ok(job) = jobs.try_recv() {
                    pending.push(job);
                }
                if pending.is_empty() {
                    registry.workers.remove(&user_id);
                    registry.parked.insert(user_id, session);
                    info!(user_id, active = registry.workers.len(), "Session worker idle, session parked");
                    return;
                }

                // Events slipped in while closing; keep serving on a new channel
                let (tx, rx) = mpsc::channel(WORKER_QUEUE_CAPACITY);
                registry.workers.insert(user_id, tx);
                drop(registry);
                jobs = rx;
                for job in pending {
                    serve(&context, &mut session, &mut queue, job).await;
                }
                continue;
            }
        };
        serve(&context, &mut session, &mut queue, job).await;
    }
    debug!(user_id, "Session worker stopped");
}

async fn serve<B: BackendGateway>(
    context: &WorkerContext<B>,
    session: &mut Session,
    queue: &mut Option<WordQueue>,
    job: Job,
) {
    if job.language_code.is_some() {
        session.interface_language = job.language_code;
    }
    let today = (context.clock)();
    let replies = context.engine.handle(session, queue, job.event, today).await;
    debug!(user_id = session.user_id, replies = replies.len(), state = ?session.state, "Turn complete");
    if job.reply.send(replies).is_err() {
        debug!(user_id = session.user_id, "Caller went away before the reply");
    }
}

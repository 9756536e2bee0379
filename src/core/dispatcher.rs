//! Per-user FIFO queues in front of the engine.
//!
//! Each active user gets one worker task draining that user's queue in arrival order.
//! Different users run in parallel. A worker retires after sitting idle.
//! `shutdown` closes every queue and lets the workers drain what was already accepted.

use crate::config::AppConfig;
use crate::core::error::DispatchError;
use crate::core::model::{InboundEvent, UserIdentity};
use crate::core::services::Dispatch;
use crate::core::traits::ConversationEngine;
use di::{Ref, inject, injectable};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

pub type DispatchResult = Result<Dispatch, DispatchError>;

type Job = (InboundEvent, oneshot::Sender<DispatchResult>);
type Queues = Arc<Mutex<HashMap<UserIdentity, mpsc::UnboundedSender<Job>>>>;

pub struct UserQueues {
    engine: Ref<dyn ConversationEngine>,
    idle: Duration,
    queues: Queues,
    workers: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

#[injectable]
impl UserQueues {
    #[inject]
    pub fn create(engine: Ref<dyn ConversationEngine>, config: Ref<AppConfig>) -> UserQueues {
        UserQueues::new(engine, config.queue_idle)
    }
}

fn lock(queues: &Queues) -> MutexGuard<'_, HashMap<UserIdentity, mpsc::UnboundedSender<Job>>> {
    queues.lock().unwrap_or_else(PoisonError::into_inner)
}

impl UserQueues {
    pub fn new(engine: Ref<dyn ConversationEngine>, idle: Duration) -> UserQueues {
        UserQueues {
            engine,
            idle,
            queues: Arc::default(),
            workers: Mutex::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues `event` behind earlier events of the same user.
    ///
    /// The returned receiver resolves once the event has been processed; callers that
    /// only need to enqueue can drop it. After `shutdown` the event is refused and the
    /// receiver resolves to an error.
    pub fn submit(&self, event: InboundEvent) -> oneshot::Receiver<DispatchResult> {
        let (reply, receiver) = oneshot::channel();
        let user = event.user;

        let mut queues = lock(&self.queues);
        if self.closed.load(Ordering::SeqCst) {
            warn!("queues are shut down, dropping event from {user}");
            return receiver;
        }
        let job = match queues.get(&user) {
            Some(sender) => match sender.send((event, reply)) {
                Ok(()) => return receiver,
                // the worker died; start a new one with the same job
                Err(SendError(job)) => job,
            },
            None => (event, reply),
        };

        let (sender, jobs) = mpsc::unbounded_channel();
        let _ = sender.send(job);
        queues.insert(user, sender);

        // spawned under the map lock, so `shutdown` never misses a worker
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        // reap retired workers so the set only holds live ones
        while workers.try_join_next().is_some() {}
        workers.spawn(worker(
            user,
            jobs,
            self.engine.clone(),
            self.queues.clone(),
            self.idle,
        ));

        receiver
    }

    /// Queues `event` and waits for its result.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchResult {
        self.submit(event)
            .await
            .unwrap_or(Err(DispatchError::QueueClosed))
    }

    /// Users with a live worker.
    pub fn active_users(&self) -> usize {
        lock(&self.queues).len()
    }

    /// Refuses new events, then waits up to `grace` for every worker to finish the
    /// events it already accepted. Workers still busy after that are aborted.
    ///
    /// Returns `true` if every queue drained in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        {
            let mut queues = lock(&self.queues);
            self.closed.store(true, Ordering::SeqCst);
            // dropping the senders ends each worker once its queue is empty
            queues.clear();
        }

        let mut workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let pending = workers.len();
        let drained = tokio::time::timeout(grace, drain(&mut workers))
            .await
            .is_ok();

        if drained {
            info!("drained {pending} user queues");
        } else {
            warn!(
                "{} user queues still busy after {grace:?}, aborting them",
                workers.len()
            );
            workers.shutdown().await;
        }
        drained
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            warn!("queue worker failed: {e}");
        }
    }
}

async fn worker(
    user: UserIdentity,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    engine: Ref<dyn ConversationEngine>,
    queues: Queues,
    idle: Duration,
) {
    debug!("queue for {user} started");

    loop {
        let job = match tokio::time::timeout(idle, jobs.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => match retire(&queues, user, &mut jobs) {
                Some(job) => job,
                None => break,
            },
        };

        let (event, reply) = job;
        let _ = reply.send(engine.process(event).await);
    }

    debug!("queue for {user} retired");
}

/// Unregisters the queue unless a job slipped in. Submitters enqueue while holding the
/// map lock, so nothing can arrive after the entry is gone.
fn retire(
    queues: &Queues,
    user: UserIdentity,
    jobs: &mut mpsc::UnboundedReceiver<Job>,
) -> Option<Job> {
    let mut queues = lock(queues);
    match jobs.try_recv() {
        Ok(job) => Some(job),
        Err(_) => {
            queues.remove(&user);
            None
        }
    }
}

//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_recruit_bot::core::error::{EffectError, StoreError};
use tokio_recruit_bot::core::executor::ExecutionReport;
use tokio_recruit_bot::core::model::{
    Effect, InboundEvent, OutboundAction, OutboundMessage, Sender, Session, UserIdentity,
};
use tokio_recruit_bot::core::traits::{EffectExecutor, MessageSender};
use tokio_recruit_bot::infrastructure::memory::InMemorySessionStore;
use tokio_recruit_bot::infrastructure::traits::SessionStore;

/// In-memory SQLite with migrations applied. One connection, so every query sees
/// the same database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

pub fn ann() -> Sender {
    Sender {
        username: Some("annlee".to_string()),
        full_name: "Ann Lee".to_string(),
    }
}

/// The full candidate registration as the platform would deliver it.
pub fn candidate_flow(user: UserIdentity) -> Vec<InboundEvent> {
    vec![
        InboundEvent::command(user, "/start").with_sender(ann()),
        InboundEvent::callback(user, "job_seeker")
            .with_sender(ann())
            .with_callback_id("cb-1"),
        InboundEvent::text(user, "Ann").with_sender(ann()),
        InboundEvent::text(user, "Lee").with_sender(ann()),
        InboundEvent::text(user, "ann@x.com").with_sender(ann()),
    ]
}

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub answered: Mutex<Vec<String>>,
    pub failing: AtomicBool,
}

impl RecordingSender {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), EffectError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EffectError::Transport("connection reset".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), EffectError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

/// Records what it was asked to do and reports success.
#[derive(Default)]
pub struct RecordingExecutor {
    pub effects: Mutex<Vec<Effect>>,
    pub outbound: Mutex<Vec<OutboundAction>>,
}

impl RecordingExecutor {
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.outbound
            .lock()
            .unwrap()
            .iter()
            .filter_map(|action| match action {
                OutboundAction::Send(message) => Some(message.text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EffectExecutor for RecordingExecutor {
    async fn execute(
        &self,
        effects: Vec<Effect>,
        outbound: Vec<OutboundAction>,
    ) -> ExecutionReport {
        self.effects.lock().unwrap().extend(effects);
        self.outbound.lock().unwrap().extend(outbound);
        ExecutionReport::default()
    }
}

/// Wraps the in-memory store with injectable failures and latency, and tracks how
/// many calls for one user overlap.
#[derive(Default)]
pub struct ControlledStore {
    pub inner: InMemorySessionStore,
    pub fail_commit: AtomicBool,
    pub get_delay: Mutex<Option<Duration>>,
    pub commit_delay: Mutex<Option<Duration>>,
    /// With a commit delay, write first and only then stall the acknowledgment.
    pub write_before_delay: AtomicBool,
    inside: AtomicUsize,
    pub max_inside: AtomicUsize,
}

impl ControlledStore {
    pub fn with_get_delay(delay: Duration) -> Self {
        let store = ControlledStore::default();
        *store.get_delay.lock().unwrap() = Some(delay);
        store
    }

    /// A commit that stalls for `delay` before writing anything.
    pub fn with_commit_delay(delay: Duration) -> Self {
        let store = ControlledStore::default();
        *store.commit_delay.lock().unwrap() = Some(delay);
        store
    }

    /// A commit whose write lands at once but whose acknowledgment takes `delay`.
    pub fn with_slow_ack(delay: Duration) -> Self {
        let store = ControlledStore::with_commit_delay(delay);
        store.write_before_delay.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl SessionStore for ControlledStore {
    async fn get(&self, user: UserIdentity) -> Result<Session, StoreError> {
        let inside = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(inside, Ordering::SeqCst);

        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(user).await
    }

    async fn commit(&self, session: &Session) -> Result<(), StoreError> {
        self.inside.fetch_sub(1, Ordering::SeqCst);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk I/O error".to_string()));
        }

        let delay = *self.commit_delay.lock().unwrap();
        let Some(delay) = delay else {
            return self.inner.commit(session).await;
        };
        if self.write_before_delay.load(Ordering::SeqCst) {
            self.inner.commit(session).await?;
            tokio::time::sleep(delay).await;
            Ok(())
        } else {
            tokio::time::sleep(delay).await;
            self.inner.commit(session).await
        }
    }
}

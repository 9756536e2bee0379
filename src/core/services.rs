//! Implementations for the service the app needs.
//!

use crate::config::AppConfig;
use crate::core::error::{DispatchError, StoreError};
use crate::core::executor::ExecutionReport;
use crate::core::handlers;
use crate::core::locks::UserLocks;
use crate::core::model::{ConversationState, InboundEvent, Session, UserIdentity};
use crate::core::router::{self, Route};
use crate::core::traits::{ConversationEngine, EffectExecutor};
use crate::infrastructure::traits::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, inject, injectable};
use log::{info, warn};
use std::future::Future;
use std::time::Duration;

/// What happened to one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub user: UserIdentity,
    pub route: Route,
    pub from: ConversationState,
    pub to: ConversationState,
    pub report: ExecutionReport,
}

pub struct SessionConversationEngine {
    store: Ref<dyn SessionStore>,
    executor: Ref<dyn EffectExecutor>,
    store_timeout: Duration,
    locks: UserLocks,
}

#[injectable(ConversationEngine)]
impl SessionConversationEngine {
    #[inject]
    pub fn create(
        store: Ref<dyn SessionStore>,
        executor: Ref<dyn EffectExecutor>,
        config: Ref<AppConfig>,
    ) -> SessionConversationEngine {
        SessionConversationEngine::new(store, executor, config.store_timeout)
    }
}

impl SessionConversationEngine {
    pub fn new(
        store: Ref<dyn SessionStore>,
        executor: Ref<dyn EffectExecutor>,
        store_timeout: Duration,
    ) -> SessionConversationEngine {
        SessionConversationEngine {
            store,
            executor,
            store_timeout,
            locks: UserLocks::default(),
        }
    }

    /// Bounds a store call; a timeout counts as a store failure.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }

    /// Load, route, handle and commit under the user's lock.
    ///
    /// Nothing outside the session store is touched here, so an error leaves no trace.
    async fn advance(
        &self,
        event: &InboundEvent,
    ) -> Result<(Route, ConversationState, handlers::Outcome), StoreError> {
        let _guard = self.locks.lock(event.user).await;

        let session = self.bounded(self.store.get(event.user)).await?;
        let from = session.state;
        let route = router::select(from, event);
        let outcome = handlers::run(route, from, event, session.form);

        let next = Session {
            user: event.user,
            state: outcome.next_state,
            form: outcome.form.clone(),
            updated_at: Utc::now(),
        };
        match self.bounded(self.store.commit(&next)).await {
            Ok(()) => {}
            // the abandoned write may have landed anyway
            Err(StoreError::Timeout(bound)) => {
                if !self.landed(&next).await {
                    return Err(StoreError::Timeout(bound));
                }
                warn!("late commit for {} confirmed by re-read", event.user);
            }
            Err(e) => return Err(e),
        }

        Ok((route, from, outcome))
    }

    async fn landed(&self, next: &Session) -> bool {
        match self.bounded(self.store.get(next.user)).await {
            Ok(stored) => stored.state == next.state && stored.form == next.form,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ConversationEngine for SessionConversationEngine {
    async fn process(&self, event: InboundEvent) -> Result<Dispatch, DispatchError> {
        let (route, from, outcome) = self.advance(&event).await.inspect_err(|e| {
            warn!("event from {} aborted, session unchanged: {e}", event.user)
        })?;

        info!(
            "{}: {route:?}, {from} -> {}",
            event.user, outcome.next_state
        );

        let report = self
            .executor
            .execute(outcome.effects, outcome.outbound)
            .await;

        Ok(Dispatch {
            user: event.user,
            route,
            from,
            to: outcome.next_state,
            report,
        })
    }
}

//! DI "Interfaces"

use crate::core::error::{DispatchError, EffectError};
use crate::core::executor::ExecutionReport;
use crate::core::model::{Effect, InboundEvent, OutboundAction, OutboundMessage, RegisterUser};
use crate::core::services::Dispatch;
use async_trait::async_trait;

#[async_trait]
pub trait ConversationEngine: Send + Sync {
    /// Runs one event through load, route, handle and commit, then executes the
    /// resulting side effects.
    ///
    /// Returns `Err` if the session could not be loaded or committed. In that case the
    /// session is unchanged and no side effect has run.
    async fn process(&self, event: InboundEvent) -> Result<Dispatch, DispatchError>;
}

#[async_trait]
pub trait EffectExecutor: Send + Sync {
    /// Answers callbacks first, then runs `effects`, then sends messages, each group
    /// in the given order.
    ///
    /// Every item runs independently; a failure is reported, never rolled back.
    async fn execute(&self, effects: Vec<Effect>, outbound: Vec<OutboundAction>)
    -> ExecutionReport;
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), EffectError>;

    async fn answer_callback(&self, callback_id: &str) -> Result<(), EffectError>;
}

/// Result of the external create-user call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created,
    /// Any non-201 answer, with the response body.
    Rejected(String),
    /// No API configured.
    Skipped,
}

#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn register(&self, request: &RegisterUser) -> Result<Registration, EffectError>;
}

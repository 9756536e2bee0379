//! Error types for the dispatcher

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// A single side effect or outbound action failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EffectError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("external api error: {0}")]
    ExternalApi(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The inbound payload could not be turned into an `InboundEvent`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed event: {0}")]
pub struct MalformedEvent(pub String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Session load or commit failed; nothing was applied.
    #[error("event aborted: {0}")]
    Aborted(#[from] StoreError),
    #[error("user queue closed")]
    QueueClosed,
}

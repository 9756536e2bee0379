use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use std::convert::Infallible;

pub mod messages;
pub mod webhook;

const X_SECRET_TOKEN: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Secret token the platform echoes back on every webhook delivery, if any.
///
/// Kept as raw bytes: a header that is not valid text is simply a wrong token.
#[derive(Debug)]
pub struct WebhookSecret(pub Option<Vec<u8>>);

impl WebhookSecret {
    /// Compares with `expected` in time independent of where the bytes differ.
    pub fn matches(&self, expected: &str) -> bool {
        match &self.0 {
            Some(token) => constant_time_eq(token, expected.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[async_trait]
impl<S> FromRequestParts<S> for WebhookSecret
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let token = parts
            .headers
            .get(X_SECRET_TOKEN)
            .map(|token| token.as_bytes().to_vec());
        Ok(WebhookSecret(token))
    }
}

pub fn router() -> Router {
    Router::new()
        .merge(webhook::router())
        .merge(messages::router())
        .route("/health", get(health))
}

async fn health() -> Json<webhook::schemas::Ack> {
    Json(webhook::schemas::Ack { ok: true })
}

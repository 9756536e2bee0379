//! Inbound updates from the chat platform

use crate::api::WebhookSecret;
use crate::api::webhook::schemas::Ack;
use crate::config::{AppConfig, WEBHOOK_PATH};
use crate::core::dispatcher::UserQueues;
use crate::core::events;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::{debug, warn};

pub fn router() -> Router {
    Router::new().route(WEBHOOK_PATH, post(receive_update))
}

/// Acknowledges every authentic delivery right away, even ones that cannot be
/// parsed. Handling continues on the user's queue.
async fn receive_update(
    Inject(queues): Inject<UserQueues>,
    Inject(config): Inject<AppConfig>,
    secret: WebhookSecret,
    body: Bytes,
) -> (StatusCode, Json<Ack>) {
    if let Some(expected) = &config.webhook_secret {
        if !secret.matches(expected) {
            warn!("rejected webhook delivery with a missing or wrong secret token");
            return (StatusCode::UNAUTHORIZED, Json(Ack { ok: false }));
        }
    }

    match events::parse_update(&body) {
        Ok(event) => {
            debug!("queued {:?} from {}", event.kind, event.user);
            // the reply is not awaited here
            drop(queues.submit(event));
        }
        Err(e) => warn!("ignoring update: {e}"),
    }

    (StatusCode::OK, Json(Ack { ok: true }))
}

pub mod schemas {
    use serde::Serialize;

    #[derive(Serialize, Debug)]
    pub struct Ack {
        pub ok: bool,
    }
}

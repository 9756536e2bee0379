//! Programmatic send endpoint, outside the conversation flow

use crate::api::messages::schemas::{SendMessage, SendMessageStatus};
use crate::core::model::{OutboundMessage, UserIdentity};
use crate::core::traits::MessageSender;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::{error, info};

pub fn router() -> Router {
    Router::new().route("/send_message", post(send_message))
}

async fn send_message(
    Inject(sender): Inject<dyn MessageSender>,
    payload: Result<Json<SendMessage>, JsonRejection>,
) -> (StatusCode, Json<SendMessageStatus>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                rejection.status(),
                Json(SendMessageStatus::error(rejection.body_text())),
            );
        }
    };

    let message = OutboundMessage::plain(UserIdentity(request.chat_id), request.text);
    match sender.send(&message).await {
        Ok(()) => {
            info!("direct message sent to {}", request.chat_id);
            (
                StatusCode::OK,
                Json(SendMessageStatus::success("Message sent successfully")),
            )
        }
        Err(e) => {
            error!("direct message to {} failed: {e}", request.chat_id);
            (
                StatusCode::BAD_GATEWAY,
                Json(SendMessageStatus::error(e.to_string())),
            )
        }
    }
}

pub mod schemas {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct SendMessage {
        pub chat_id: i64,
        pub text: String,
    }

    #[derive(Serialize, Debug, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Status {
        Success,
        Error,
    }

    #[derive(Serialize, Debug)]
    pub struct SendMessageStatus {
        pub status: Status,
        pub message: String,
    }

    impl SendMessageStatus {
        pub fn success(message: impl Into<String>) -> Self {
            SendMessageStatus {
                status: Status::Success,
                message: message.into(),
            }
        }

        pub fn error(message: impl Into<String>) -> Self {
            SendMessageStatus {
                status: Status::Error,
                message: message.into(),
            }
        }
    }
}

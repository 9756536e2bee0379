//! Turns raw Telegram updates into `InboundEvent`s.

use crate::core::error::MalformedEvent;
use crate::core::model::{EventKind, InboundEvent, Sender, UserIdentity};
use teloxide::types::{CallbackQuery, Message, Update, UpdateKind, User};

pub fn parse_update(body: &[u8]) -> Result<InboundEvent, MalformedEvent> {
    let update: Update =
        serde_json::from_slice(body).map_err(|e| MalformedEvent(e.to_string()))?;
    normalize(&update)
}

pub fn normalize(update: &Update) -> Result<InboundEvent, MalformedEvent> {
    match &update.kind {
        UpdateKind::Message(message) => from_message(message),
        UpdateKind::CallbackQuery(query) => from_callback(query),
        _ => Err(MalformedEvent(format!(
            "update {} is not a message or callback query",
            update.id.0
        ))),
    }
}

fn identity(user: &User) -> Result<UserIdentity, MalformedEvent> {
    i64::try_from(user.id.0)
        .map(UserIdentity)
        .map_err(|_| MalformedEvent(format!("user id {} out of range", user.id.0)))
}

fn sender(user: &User) -> Sender {
    Sender {
        username: user.username.clone(),
        full_name: user.full_name(),
    }
}

fn from_message(message: &Message) -> Result<InboundEvent, MalformedEvent> {
    let user = message
        .from
        .as_ref()
        .ok_or_else(|| MalformedEvent("message without sender".to_owned()))?;

    let (kind, payload) = match message.text() {
        Some(text) if text.starts_with('/') => (EventKind::Command, text),
        Some(text) => (EventKind::Text, text),
        None => (EventKind::Unsupported, ""),
    };

    Ok(InboundEvent::new(identity(user)?, kind, payload).with_sender(sender(user)))
}

fn from_callback(query: &CallbackQuery) -> Result<InboundEvent, MalformedEvent> {
    let data = query
        .data
        .as_deref()
        .ok_or_else(|| MalformedEvent("callback query without data".to_owned()))?;

    Ok(InboundEvent::callback(identity(&query.from)?, data)
        .with_sender(sender(&query.from))
        .with_callback_id(query.id.0.clone()))
}

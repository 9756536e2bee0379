//! Pure handler selection.
//!
//! Priority, first match wins:
//! 1. a recognized command, in any state
//! 2. a role callback while idle or choosing a role
//! 3. text while a form field is awaited
//! 4. the fallback

use crate::core::model::{ConversationState, EventKind, Field, InboundEvent, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
}

impl Command {
    /// Parses the leading token of a command message, ignoring an `@botname` suffix
    /// and any arguments.
    pub fn parse(text: &str) -> Option<Command> {
        let token = text.split_whitespace().next()?;
        let token = token.split('@').next().unwrap_or(token);
        match token {
            "/start" => Some(Command::Start),
            "/cancel" => Some(Command::Cancel),
            "/help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Input nothing else claimed. Not an error, the fallback handler answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhandledInput {
    UnknownCommand,
    StrayCallback,
    Text,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    StartFlow,
    CancelFlow,
    Help,
    SelectRole(Role),
    CaptureField(Field),
    Fallback(UnhandledInput),
}

pub fn select(state: ConversationState, event: &InboundEvent) -> Route {
    match event.kind {
        EventKind::Command => match Command::parse(&event.payload) {
            Some(Command::Start) => Route::StartFlow,
            Some(Command::Cancel) => Route::CancelFlow,
            Some(Command::Help) => Route::Help,
            None => Route::Fallback(UnhandledInput::UnknownCommand),
        },
        EventKind::CallbackData => match (state, Role::from_callback(&event.payload)) {
            (ConversationState::Idle | ConversationState::AwaitingRoleChoice, Some(role)) => {
                Route::SelectRole(role)
            }
            _ => Route::Fallback(UnhandledInput::StrayCallback),
        },
        EventKind::Text => match state.awaited_field() {
            Some(field) => Route::CaptureField(field),
            None => Route::Fallback(UnhandledInput::Text),
        },
        EventKind::Unsupported => Route::Fallback(UnhandledInput::Unsupported),
    }
}

//! Domain types shared by the router, handlers and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Platform-assigned user id. In private chats it doubles as the chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(pub i64);

impl Display for UserIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingRoleChoice,
    AwaitingName,
    AwaitingSurname,
    AwaitingEmail,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingRoleChoice => "awaiting_role_choice",
            ConversationState::AwaitingName => "awaiting_name",
            ConversationState::AwaitingSurname => "awaiting_surname",
            ConversationState::AwaitingEmail => "awaiting_email",
        }
    }

    /// The form field a text message fills in this state, if any.
    pub fn awaited_field(&self) -> Option<Field> {
        match self {
            ConversationState::AwaitingName => Some(Field::Name),
            ConversationState::AwaitingSurname => Some(Field::Surname),
            ConversationState::AwaitingEmail => Some(Field::Email),
            ConversationState::Idle | ConversationState::AwaitingRoleChoice => None,
        }
    }
}

impl Display for ConversationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ConversationState::Idle),
            "awaiting_role_choice" => Ok(ConversationState::AwaitingRoleChoice),
            "awaiting_name" => Ok(ConversationState::AwaitingName),
            "awaiting_surname" => Ok(ConversationState::AwaitingSurname),
            "awaiting_email" => Ok(ConversationState::AwaitingEmail),
            other => Err(format!("unknown conversation state `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Employer,
}

impl Role {
    /// Callback payload carried by the role buttons.
    pub fn from_callback(data: &str) -> Option<Role> {
        match data {
            "job_seeker" => Some(Role::Candidate),
            "employer" => Some(Role::Employer),
            _ => None,
        }
    }

    pub fn callback_token(&self) -> &'static str {
        match self {
            Role::Candidate => "job_seeker",
            Role::Employer => "employer",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile fields collected one per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Surname,
    Email,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Surname => "surname",
            Field::Email => "email",
        }
    }
}

/// Partial profile under construction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    // The chat flow never asks for the fields below; `SaveProfile` persists them
    // when a form carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_salary: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl FormData {
    pub fn for_role(role: Role) -> Self {
        FormData {
            role: Some(role),
            ..FormData::default()
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = Some(value),
            Field::Surname => self.surname = Some(value),
            Field::Email => self.email = Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserIdentity,
    pub state: ConversationState,
    pub form: FormData,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Session handed out for users the store has never seen.
    pub fn fresh(user: UserIdentity) -> Self {
        Session {
            user,
            state: ConversationState::Idle,
            form: FormData::default(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Command,
    Text,
    CallbackData,
    /// A message without text (photo, sticker, ...).
    Unsupported,
}

/// Who sent the event, as far as the platform tells us.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sender {
    pub username: Option<String>,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user: UserIdentity,
    pub kind: EventKind,
    pub payload: String,
    pub sender: Sender,
    /// Set for callback events; the platform expects every button press to be answered.
    pub callback_id: Option<String>,
}

impl InboundEvent {
    pub fn command(user: UserIdentity, command: &str) -> Self {
        Self::new(user, EventKind::Command, command)
    }

    pub fn text(user: UserIdentity, text: &str) -> Self {
        Self::new(user, EventKind::Text, text)
    }

    pub fn callback(user: UserIdentity, data: &str) -> Self {
        Self::new(user, EventKind::CallbackData, data)
    }

    pub fn new(user: UserIdentity, kind: EventKind, payload: &str) -> Self {
        InboundEvent {
            user,
            kind,
            payload: payload.to_owned(),
            sender: Sender::default(),
            callback_id: None,
        }
    }

    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_callback_id(mut self, id: impl Into<String>) -> Self {
        self.callback_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub target: UserIdentity,
    pub text: String,
    pub format: TextFormat,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn plain(target: UserIdentity, text: impl Into<String>) -> Self {
        OutboundMessage {
            target,
            text: text.into(),
            format: TextFormat::Plain,
            keyboard: None,
        }
    }

    pub fn html(target: UserIdentity, text: impl Into<String>) -> Self {
        OutboundMessage {
            format: TextFormat::Html,
            ..Self::plain(target, text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// User-facing transport actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    Send(OutboundMessage),
    AnswerCallback { callback_id: String },
}

/// Body of the external create-user call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterUser {
    pub username: String,
    pub role: Role,
    pub id: String,
}

/// Side effects requested by a handler, run only after the session commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Get-or-create the role's profile row.
    EnsureProfile {
        user: UserIdentity,
        role: Role,
        username: Option<String>,
    },
    UpdateProfileField {
        user: UserIdentity,
        role: Role,
        field: Field,
        value: String,
    },
    /// Upsert every populated field of a finished form.
    SaveProfile {
        user: UserIdentity,
        role: Role,
        form: FormData,
    },
    RegisterExternal {
        user: UserIdentity,
        request: RegisterUser,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::EnsureProfile { .. } => "ensure_profile",
            Effect::UpdateProfileField { .. } => "update_profile_field",
            Effect::SaveProfile { .. } => "save_profile",
            Effect::RegisterExternal { .. } => "register_external",
        }
    }

    /// The user a failure of this effect is reported to.
    pub fn user(&self) -> UserIdentity {
        match self {
            Effect::EnsureProfile { user, .. }
            | Effect::UpdateProfileField { user, .. }
            | Effect::SaveProfile { user, .. }
            | Effect::RegisterExternal { user, .. } => *user,
        }
    }
}

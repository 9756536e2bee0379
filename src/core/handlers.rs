//! Per-route business logic.
//!
//! Handlers never touch the store or the transport. They describe the next session and
//! everything that should happen once it has been committed.

use crate::core::model::{
    Button, ConversationState, Effect, Field, FormData, InboundEvent, Keyboard, OutboundAction,
    OutboundMessage, RegisterUser, Role,
};
use crate::core::router::{Route, UnhandledInput};
use teloxide::utils::html;

pub const START_HINT: &str = "Please use /start to begin.";

const HELP_TEXT: &str = "I help job seekers and employers register.\n\
/start - begin (or restart) registration\n\
/cancel - abandon the current registration\n\
/help - show this message";

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub form: FormData,
    pub next_state: ConversationState,
    pub outbound: Vec<OutboundAction>,
    pub effects: Vec<Effect>,
}

impl Outcome {
    pub fn new(next_state: ConversationState, form: FormData) -> Self {
        Outcome {
            form,
            next_state,
            outbound: vec![],
            effects: vec![],
        }
    }

    pub fn with_message(mut self, message: OutboundMessage) -> Self {
        self.outbound.push(OutboundAction::Send(message));
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Acknowledges the button press when the event came from one.
    fn answering(mut self, event: &InboundEvent) -> Self {
        if let Some(callback_id) = &event.callback_id {
            self.outbound.insert(
                0,
                OutboundAction::AnswerCallback {
                    callback_id: callback_id.clone(),
                },
            );
        }
        self
    }
}

pub fn run(
    route: Route,
    state: ConversationState,
    event: &InboundEvent,
    form: FormData,
) -> Outcome {
    match route {
        Route::StartFlow => start_flow(event),
        Route::CancelFlow => cancel_flow(state, event),
        Route::Help => Outcome::new(state, form)
            .with_message(OutboundMessage::plain(event.user, HELP_TEXT)),
        Route::SelectRole(role) => select_role(role, event),
        Route::CaptureField(field) => capture_field(field, event, form),
        Route::Fallback(input) => fallback(input, state, event, form),
    }
}

pub fn role_keyboard() -> Keyboard {
    let button = |label: &str, role: Role| {
        vec![Button {
            label: label.to_owned(),
            data: role.callback_token().to_owned(),
        }]
    };

    Keyboard {
        rows: vec![
            button("I'm looking for a job", Role::Candidate),
            button("I'm an employer", Role::Employer),
        ],
    }
}

/// Always starts over: any in-progress form is discarded, never merged.
fn start_flow(event: &InboundEvent) -> Outcome {
    let name = if event.sender.full_name.trim().is_empty() {
        "there".to_owned()
    } else {
        html::escape(&event.sender.full_name)
    };

    Outcome::new(ConversationState::AwaitingRoleChoice, FormData::default()).with_message(
        OutboundMessage::html(event.user, format!("Hello, <b>{name}</b>!\nWho are you?"))
            .with_keyboard(role_keyboard()),
    )
}

fn cancel_flow(state: ConversationState, event: &InboundEvent) -> Outcome {
    let text = if state == ConversationState::Idle {
        "Nothing to cancel. Send /start to register."
    } else {
        "Registration cancelled. Send /start to begin again."
    };

    Outcome::new(ConversationState::Idle, FormData::default())
        .with_message(OutboundMessage::plain(event.user, text))
}

/// Choosing a role (again) resets the form to that role.
fn select_role(role: Role, event: &InboundEvent) -> Outcome {
    let prompt = match role {
        Role::Candidate => "Great, let's set up your job seeker profile. What is your first name?",
        Role::Employer => "Great, let's set up your employer profile. What is your first name?",
    };

    Outcome::new(ConversationState::AwaitingName, FormData::for_role(role))
        .with_effect(Effect::EnsureProfile {
            user: event.user,
            role,
            username: event.sender.username.clone(),
        })
        .with_effect(Effect::RegisterExternal {
            user: event.user,
            request: RegisterUser {
                username: event
                    .sender
                    .username
                    .clone()
                    .unwrap_or_else(|| "unknown".to_owned()),
                role,
                id: event.user.to_string(),
            },
        })
        .with_message(OutboundMessage::plain(event.user, prompt))
        .answering(event)
}

/// Field text is taken as-is, empty or not.
fn capture_field(field: Field, event: &InboundEvent, mut form: FormData) -> Outcome {
    let Some(role) = form.role else {
        return Outcome::new(ConversationState::Idle, FormData::default()).with_message(
            OutboundMessage::plain(
                event.user,
                "Your registration has expired. Send /start to begin again.",
            ),
        );
    };

    form.set(field, event.payload.clone());

    match field {
        Field::Name => Outcome::new(ConversationState::AwaitingSurname, form)
            .with_effect(update_field(event, role, field))
            .with_message(OutboundMessage::plain(event.user, "Thanks! What is your surname?")),
        Field::Surname => Outcome::new(ConversationState::AwaitingEmail, form)
            .with_effect(update_field(event, role, field))
            .with_message(OutboundMessage::plain(
                event.user,
                "And your email address?",
            )),
        Field::Email => {
            let text = format!(
                "All set, {}! Your {role} profile has been saved.",
                form.name.as_deref().unwrap_or_default()
            );
            Outcome::new(ConversationState::Idle, FormData::default())
                .with_effect(Effect::SaveProfile {
                    user: event.user,
                    role,
                    form,
                })
                .with_message(OutboundMessage::plain(event.user, text))
        }
    }
}

fn update_field(event: &InboundEvent, role: Role, field: Field) -> Effect {
    Effect::UpdateProfileField {
        user: event.user,
        role,
        field,
        value: event.payload.clone(),
    }
}

/// Leaves state and form untouched.
fn fallback(
    input: UnhandledInput,
    state: ConversationState,
    event: &InboundEvent,
    form: FormData,
) -> Outcome {
    let reply = match input {
        UnhandledInput::Text => event.payload.clone(),
        UnhandledInput::Unsupported => format!("Nice try! I only understand text. {START_HINT}"),
        UnhandledInput::UnknownCommand => format!("Unknown command. {START_HINT}"),
        UnhandledInput::StrayCallback => {
            format!("That button is not active right now. {START_HINT}")
        }
    };

    Outcome::new(state, form)
        .with_message(OutboundMessage::plain(event.user, reply))
        .answering(event)
}

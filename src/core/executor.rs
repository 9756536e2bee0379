//! Runs the side effects and outbound actions of a committed transition.

use crate::core::error::EffectError;
use crate::core::model::{Effect, OutboundAction, OutboundMessage, UserIdentity};
use crate::core::traits::{EffectExecutor, MessageSender, ProfileApi, Registration};
use crate::infrastructure::traits::ProfileRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{error, warn};

const SAVE_APOLOGY: &str =
    "Sorry, something went wrong while saving your data. Please try again later.";
const SEND_APOLOGY: &str = "Sorry, I could not deliver a reply. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub action: &'static str,
    pub result: Result<(), EffectError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionReport {
    pub results: Vec<ActionResult>,
}

impl ExecutionReport {
    fn record(&mut self, action: &'static str, result: Result<(), EffectError>) {
        self.results.push(ActionResult { action, result });
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.results.iter().filter(|r| r.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[injectable(EffectExecutor)]
pub struct SideEffectExecutor {
    sender: Ref<dyn MessageSender>,
    profiles: Ref<dyn ProfileRepository>,
    profile_api: Ref<dyn ProfileApi>,
}

impl SideEffectExecutor {
    pub fn new(
        sender: Ref<dyn MessageSender>,
        profiles: Ref<dyn ProfileRepository>,
        profile_api: Ref<dyn ProfileApi>,
    ) -> Self {
        SideEffectExecutor {
            sender,
            profiles,
            profile_api,
        }
    }

    async fn apply(&self, effect: &Effect) -> Result<(), EffectError> {
        match effect {
            Effect::EnsureProfile {
                user,
                role,
                username,
            } => {
                self.profiles
                    .ensure(*user, *role, username.as_deref())
                    .await?;
                Ok(())
            }
            Effect::UpdateProfileField {
                user,
                role,
                field,
                value,
            } => Ok(self
                .profiles
                .update_field(*user, *role, *field, value)
                .await?),
            Effect::SaveProfile { user, role, form } => {
                Ok(self.profiles.save(*user, *role, form).await?)
            }
            Effect::RegisterExternal { user, request } => {
                match self.profile_api.register(request).await {
                    Ok(Registration::Created) => {
                        self.notify(
                            *user,
                            format!("Your data has been saved as: {}.", request.role),
                        )
                        .await;
                        Ok(())
                    }
                    Ok(Registration::Rejected(body)) => {
                        self.notify(*user, format!("Error while saving your data: {body}"))
                            .await;
                        Err(EffectError::ExternalApi(body))
                    }
                    Ok(Registration::Skipped) => Ok(()),
                    Err(e) => {
                        self.notify(*user, format!("Could not submit your data: {e}"))
                            .await;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Best effort; a failure here is only logged.
    async fn notify(&self, user: UserIdentity, text: String) {
        if let Err(e) = self.sender.send(&OutboundMessage::plain(user, text)).await {
            warn!("could not notify {user}: {e}");
        }
    }

    async fn perform(&self, action: &OutboundAction, report: &mut ExecutionReport) {
        match action {
            OutboundAction::Send(message) => {
                let result = self.sender.send(message).await;
                if let Err(e) = &result {
                    error!("sending to {} failed: {e}", message.target);
                    self.notify(message.target, SEND_APOLOGY.to_owned()).await;
                }
                report.record("send_message", result);
            }
            OutboundAction::AnswerCallback { callback_id } => {
                let result = self.sender.answer_callback(callback_id).await;
                if let Err(e) = &result {
                    error!("answering callback {callback_id} failed: {e}");
                }
                report.record("answer_callback", result);
            }
        }
    }
}

#[async_trait]
impl EffectExecutor for SideEffectExecutor {
    async fn execute(
        &self,
        effects: Vec<Effect>,
        outbound: Vec<OutboundAction>,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let (answers, sends): (Vec<_>, Vec<_>) = outbound
            .iter()
            .partition(|action| matches!(action, OutboundAction::AnswerCallback { .. }));

        // stop the button spinner before anything slow runs
        for action in answers {
            self.perform(action, &mut report).await;
        }

        for effect in &effects {
            let result = self.apply(effect).await;
            if let Err(e) = &result {
                error!("effect {} for {} failed: {e}", effect.name(), effect.user());
                if matches!(e, EffectError::Store(_)) {
                    self.notify(effect.user(), SAVE_APOLOGY.to_owned()).await;
                }
            }
            report.record(effect.name(), result);
        }

        for action in sends {
            self.perform(action, &mut report).await;
        }

        report
    }
}

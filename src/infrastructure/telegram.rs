//! Telegram transport: outbound messages and webhook registration.

use crate::config::AppConfig;
use crate::core::error::EffectError;
use crate::core::model::{Keyboard, OutboundMessage, TextFormat};
use crate::core::traits::MessageSender;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::info;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

pub struct TelegramSender {
    bot: Bot,
}

#[injectable(MessageSender)]
impl TelegramSender {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> TelegramSender {
        TelegramSender::new(Bot::new(&config.bot_token))
    }
}

impl TelegramSender {
    pub fn new(bot: Bot) -> TelegramSender {
        TelegramSender { bot }
    }
}

pub fn inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.data.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), EffectError> {
        let mut request = self
            .bot
            .send_message(ChatId(message.target.0), message.text.clone());

        if message.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(inline_keyboard(keyboard));
        }

        request
            .await
            .map(|_| ())
            .map_err(|e| EffectError::Transport(e.to_string()))
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), EffectError> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_owned()))
            .await
            .map(|_| ())
            .map_err(|e| EffectError::Transport(e.to_string()))
    }
}

pub async fn register_webhook(bot: &Bot, url: Url, secret: Option<&str>) -> anyhow::Result<()> {
    let mut request = bot.set_webhook(url.clone());
    if let Some(secret) = secret {
        request = request.secret_token(secret);
    }
    request.await?;
    info!("webhook registered at {url}");
    Ok(())
}

pub async fn delete_webhook(bot: &Bot) -> anyhow::Result<()> {
    bot.delete_webhook().await?;
    info!("webhook deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handlers::role_keyboard;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn test_role_keyboard_becomes_one_button_per_row() {
        let markup = inline_keyboard(&role_keyboard());

        assert_eq!(markup.inline_keyboard.len(), 2);
        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "I'm looking for a job");
        assert!(matches!(
            &first.kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "job_seeker"
        ));
    }
}

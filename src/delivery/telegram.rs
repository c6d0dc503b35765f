// src/delivery/telegram.rs
//! Telegram Bot API port. User ids are channel-qualified (`tg:{chat_id}`);
//! the prefix is stripped here so callers can pass them through untouched.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::MessagePort;
use crate::config::Settings;
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct BotApiEnvelope {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramPort {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
    enabled: bool,
    sandbox: bool,
}

impl TelegramPort {
    pub fn from_settings(settings: &Settings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            token: settings.telegram_bot_token.clone(),
            base_url: settings.telegram_base_url.trim_end_matches('/').to_string(),
            enabled: settings.telegram_enabled,
            sandbox: settings.telegram_sandbox_mode,
        }
    }

    fn skip_send(&self) -> bool {
        if !self.enabled {
            tracing::info!("telegram sending disabled (TELEGRAM_ENABLED=false)");
            return true;
        }
        if self.sandbox {
            tracing::info!("[SANDBOX] telegram message not sent");
            return true;
        }
        false
    }

    async fn post(&self, method: &str, payload: serde_json::Value) -> Result<(), ProviderError> {
        let token = self
            .token
            .as_deref()
            .ok_or(ProviderError::Config("TELEGRAM_BOT_TOKEN"))?;

        let response = self
            .http
            .post(format!("{}/bot{token}/{method}", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        // The Bot API reports failures in-band too.
        let envelope: BotApiEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        if !envelope.ok {
            return Err(ProviderError::Call(
                envelope.description.unwrap_or_else(|| "bot api error".to_string()),
            ));
        }
        Ok(())
    }
}

fn chat_id(to: &str) -> &str {
    to.strip_prefix("tg:").unwrap_or(to)
}

#[async_trait]
impl MessagePort for TelegramPort {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        if self.skip_send() {
            return Ok(());
        }
        tracing::info!(to, "sending text via telegram");
        self.post("sendMessage", json!({ "chat_id": chat_id(to), "text": text }))
            .await
    }

    async fn send_audio(&self, to: &str, audio_ref: &str) -> Result<(), ProviderError> {
        if self.skip_send() {
            return Ok(());
        }
        tracing::info!(to, "sending voice via telegram");
        self.post("sendVoice", json!({ "chat_id": chat_id(to), "voice": audio_ref }))
            .await
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

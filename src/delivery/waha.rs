// src/delivery/waha.rs
//! WAHA WhatsApp port (self-hosted WhatsApp HTTP API).

use async_trait::async_trait;
use serde_json::json;

use super::MessagePort;
use crate::config::Settings;
use crate::error::ProviderError;

pub struct WahaPort {
    http: reqwest::Client,
    base_url: Option<String>,
    api_token: Option<String>,
    session: String,
    sandbox: bool,
}

impl WahaPort {
    pub fn from_settings(settings: &Settings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: settings
                .waha_base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_token: settings.waha_api_token.clone(),
            session: settings.waha_session_name.clone(),
            sandbox: settings.whatsapp_sandbox_mode,
        }
    }

    async fn post(&self, endpoint: &str, payload: serde_json::Value) -> Result<(), ProviderError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(ProviderError::Config("WAHA_BASE_URL"))?;
        let token = self
            .api_token
            .as_deref()
            .ok_or(ProviderError::Config("WAHA_API_TOKEN"))?;

        let response = self
            .http
            .post(format!("{base}/api/{endpoint}"))
            .header("x-api-key", token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagePort for WahaPort {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        if self.sandbox {
            tracing::warn!(to, "[SANDBOX] WAHA text not sent");
            return Ok(());
        }
        tracing::info!(to, "sending text via waha");
        self.post(
            "sendText",
            json!({ "chatId": to, "text": text, "session": self.session }),
        )
        .await
    }

    async fn send_audio(&self, to: &str, audio_ref: &str) -> Result<(), ProviderError> {
        if self.sandbox {
            tracing::warn!(to, "[SANDBOX] WAHA voice not sent");
            return Ok(());
        }
        tracing::info!(to, "sending voice via waha");
        self.post(
            "sendVoice",
            json!({ "chatId": to, "audio": audio_ref, "session": self.session }),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "waha"
    }
}

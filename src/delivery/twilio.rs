// src/delivery/twilio.rs
//! Twilio WhatsApp port (Messages API, basic auth).

use async_trait::async_trait;

use super::MessagePort;
use crate::config::Settings;
use crate::error::ProviderError;

const AUDIO_CAPTION: &str = "Segue o áudio com a resposta do ELO.";

pub struct TwilioPort {
    http: reqwest::Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

impl TwilioPort {
    pub fn from_settings(settings: &Settings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            account_sid: settings.twilio_account_sid.clone(),
            auth_token: settings.twilio_auth_token.clone(),
            from_number: settings.twilio_whatsapp_number.clone(),
        }
    }

    async fn send(&self, to: &str, body: &str, media_url: Option<&str>) -> Result<(), ProviderError> {
        let sid = self
            .account_sid
            .as_deref()
            .ok_or(ProviderError::Config("TWILIO_ACCOUNT_SID"))?;
        let token = self
            .auth_token
            .as_deref()
            .ok_or(ProviderError::Config("TWILIO_AUTH_TOKEN"))?;
        let from = self
            .from_number
            .as_deref()
            .ok_or(ProviderError::Config("TWILIO_WHATSAPP_NUMBER"))?;

        let url = format!("https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json");
        let mut form = vec![
            ("To", format!("whatsapp:{to}")),
            ("From", format!("whatsapp:{from}")),
            ("Body", body.to_string()),
        ];
        if let Some(media) = media_url {
            form.push(("MediaUrl", media.to_string()));
        }

        let response = self
            .http
            .post(url)
            .basic_auth(sid, Some(token))
            .form(&form)
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
impl MessagePort for TwilioPort {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        tracing::info!(to, "sending text via twilio");
        self.send(to, text, None).await
    }

    async fn send_audio(&self, to: &str, audio_ref: &str) -> Result<(), ProviderError> {
        tracing::info!(to, "sending audio via twilio");
        self.send(to, AUDIO_CAPTION, Some(audio_ref)).await
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}

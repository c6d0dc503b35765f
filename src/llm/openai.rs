// src/llm/openai.rs
//! OpenAI chat-completions client.

use async_trait::async_trait;
use serde_json::json;

use super::{wire_messages, ChatCompletionResponse, ChatModel, ChatRequest};
use crate::config::Settings;
use crate::error::ProviderError;

pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiChat {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.openai_api_key.clone(),
            settings.openai_api_base.clone(),
            settings.llm_model_name.clone(),
        )
    }

    pub fn new(api_key: Option<String>, base_url: String, model: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Config("OPENAI_API_KEY"))?;

        let body = json!({
            "model": self.model,
            "messages": wire_messages(request),
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        payload.into_content()
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

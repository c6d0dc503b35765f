// src/llm/mod.rs
//! Chat-model abstraction. One implementation per provider, selected once at
//! startup from configuration and injected into the orchestrator; the prompt
//! contract is identical across providers.

pub mod azure;
pub mod openai;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{LlmProvider, Settings};
use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Provider-agnostic message set. An image URL, when present, is attached to
/// the final user message as additional content.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub image_url: Option<String>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
    fn provider_name(&self) -> &'static str;
}

/// Factory: resolved once per process. Missing credentials do not fail here;
/// they surface at call time as `ProviderError::Config`, which the
/// orchestrator treats like any exhausted call.
pub fn build_chat_model(settings: &Settings) -> Arc<dyn ChatModel> {
    match settings.llm_provider {
        LlmProvider::OpenAi => Arc::new(openai::OpenAiChat::from_settings(settings)),
        LlmProvider::Azure => Arc::new(azure::AzureChat::from_settings(settings)),
    }
}

const MAX_ATTEMPTS: u32 = 3;

/// Bounded exponential backoff around a provider call. Only transient call
/// failures are retried; config and auth failures return immediately.
pub async fn complete_with_retry(
    model: &dyn ChatModel,
    request: &ChatRequest,
) -> Result<String, ProviderError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match model.complete(request).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                let delay = Duration::from_millis(500u64 << (attempt - 1));
                tracing::warn!(
                    provider = model.provider_name(),
                    attempt,
                    error = %e,
                    "chat completion failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wire messages shared by both providers (chat-completions shape). When an
/// image is attached, the last user message becomes a text+image part list.
pub(crate) fn wire_messages(request: &ChatRequest) -> Vec<Value> {
    let mut messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    if let Some(url) = &request.image_url {
        if let Some(last) = request
            .messages
            .iter()
            .rposition(|m| m.role == ChatRole::User)
        {
            messages[last] = json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": request.messages[last].content },
                    { "type": "image_url", "image_url": { "url": url } },
                ],
            });
        }
    }
    messages
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// Empty completions count as malformed; callers fall back rather than
    /// answering with silence.
    pub(crate) fn into_content(self) -> Result<String, ProviderError> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            Err(ProviderError::Malformed("empty completion".to_string()))
        } else {
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_attaches_to_the_last_user_message() {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::new(ChatRole::System, "sys"),
                ChatMessage::new(ChatRole::User, "olha essa foto"),
            ],
            temperature: 0.3,
            image_url: Some("http://x/y.jpg".to_string()),
        };
        let wire = wire_messages(&request);
        assert_eq!(wire.len(), 2);
        assert!(wire[1]["content"].is_array());
        assert_eq!(wire[1]["content"][1]["image_url"]["url"], "http://x/y.jpg");
    }

    #[test]
    fn empty_completion_is_malformed() {
        let resp = ChatCompletionResponse { choices: vec![] };
        assert!(matches!(resp.into_content(), Err(ProviderError::Malformed(_))));
    }
}

// src/llm/azure.rs
//! Azure OpenAI client. Same prompt contract as the OpenAI client; the
//! differences are the deployment-scoped path, the `api-key` header and the
//! `api-version` query parameter.

use async_trait::async_trait;
use serde_json::json;

use super::{wire_messages, ChatCompletionResponse, ChatModel, ChatRequest};
use crate::config::Settings;
use crate::error::ProviderError;

pub struct AzureChat {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: Option<String>,
    deployment: Option<String>,
    api_version: String,
}

impl AzureChat {
    pub fn from_settings(settings: &Settings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: settings.azure_openai_api_key.clone(),
            endpoint: settings
                .azure_openai_endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            deployment: settings.azure_deployment_name.clone(),
            api_version: settings.azure_openai_api_version.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for AzureChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Config("AZURE_OPENAI_API_KEY"))?;
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ProviderError::Config("AZURE_OPENAI_ENDPOINT"))?;
        let deployment = self
            .deployment
            .as_deref()
            .ok_or(ProviderError::Config("AZURE_DEPLOYMENT_NAME"))?;

        let body = json!({
            "messages": wire_messages(request),
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(format!(
                "{endpoint}/openai/deployments/{deployment}/chat/completions"
            ))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", api_key)
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
        "azure"
    }
}

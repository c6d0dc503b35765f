// src/tts.rs
//! Speech synthesis collaborator. Audio is best-effort everywhere: a failed
//! synthesis degrades to text-only delivery, never to a failed answer.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::Settings;
use crate::error::ProviderError;

/// Opaque media handle (local path or URL) consumable by the message ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRef(pub String);

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioRef, ProviderError>;
}

pub fn build_synthesizer(settings: &Settings) -> std::sync::Arc<dyn SpeechSynthesizer> {
    if settings.tts_enabled {
        std::sync::Arc::new(OpenAiSpeech::from_settings(settings))
    } else {
        std::sync::Arc::new(DisabledSynthesizer)
    }
}

/// OpenAI audio/speech: synthesizes mp3 bytes and stores them under
/// `media/tts`, returning the file path as the media handle.
pub struct OpenAiSpeech {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    voice: String,
    output_dir: PathBuf,
}

impl OpenAiSpeech {
    pub fn from_settings(settings: &Settings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: settings.openai_api_key.clone(),
            base_url: settings.openai_api_base.trim_end_matches('/').to_string(),
            model: settings.tts_model_name.clone(),
            voice: settings.tts_voice.clone(),
            output_dir: PathBuf::from("media/tts"),
        }
    }

    fn output_path(&self, text: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let mut name = String::with_capacity(32);
        for byte in digest.iter().take(16) {
            use std::fmt::Write as _;
            let _ = write!(&mut name, "{byte:02x}");
        }
        self.output_dir.join(format!("{name}.mp3"))
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioRef, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Config("OPENAI_API_KEY"))?;

        let body = serde_json::json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "response_format": "mp3",
        });

        let response = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        let path = self.output_path(text);
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        Ok(AudioRef(path.to_string_lossy().into_owned()))
    }
}

/// Used when synthesis is switched off; callers fall back to text-only.
pub struct DisabledSynthesizer;

#[async_trait]
impl SpeechSynthesizer for DisabledSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<AudioRef, ProviderError> {
        Err(ProviderError::Config("TTS_ENABLED"))
    }
}

// src/config.rs
//! Environment-backed settings. Built once in `main` (after `dotenvy`) and
//! threaded into component constructors; components never read the
//! environment themselves.

use std::env;
use std::time::Duration;

/// Which chat-model backend answers questions. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Azure,
}

impl LlmProvider {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => LlmProvider::OpenAi,
            // Unknown values fall back to azure, the original deployment default.
            _ => LlmProvider::Azure,
        }
    }
}

/// WhatsApp delivery backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhatsAppProvider {
    Waha,
    Twilio,
    Console,
}

impl WhatsAppProvider {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "twilio" => WhatsAppProvider::Twilio,
            "console" => WhatsAppProvider::Console,
            _ => WhatsAppProvider::Waha,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_host: String,
    pub app_port: u16,

    // Chat model
    pub llm_provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub llm_model_name: String,
    pub azure_openai_api_key: Option<String>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_api_version: String,
    pub azure_deployment_name: Option<String>,

    // Speech synthesis
    pub tts_enabled: bool,
    pub tts_model_name: String,
    pub tts_voice: String,

    // WhatsApp delivery
    pub whatsapp_provider: WhatsAppProvider,
    pub whatsapp_fallback_provider: Option<WhatsAppProvider>,
    pub whatsapp_sandbox_mode: bool,
    pub waha_base_url: Option<String>,
    pub waha_api_token: Option<String>,
    pub waha_session_name: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_whatsapp_number: Option<String>,

    // Telegram delivery
    pub telegram_enabled: bool,
    pub telegram_sandbox_mode: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_base_url: String,
    pub telegram_webhook_secret: Option<String>,

    // Data sources
    pub api_camara_base_url: Option<String>,
    pub api_senado_base_url: Option<String>,
    pub source_timeout: Duration,

    // Answer pipeline
    pub send_audio_default: bool,
    pub answer_cache_ttl: Duration,
    pub user_state_ttl: Duration,
    pub seen_message_ttl: Duration,
    pub history_max_turns: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            app_host: env_or("APP_HOST", "0.0.0.0"),
            app_port: env_parse("APP_PORT", 8000),

            llm_provider: LlmProvider::parse(&env_or("LLM_PROVIDER", "azure")),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_api_base: env_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
            llm_model_name: env_or("LLM_MODEL_NAME", "gpt-4o"),
            azure_openai_api_key: env_opt("AZURE_OPENAI_API_KEY"),
            azure_openai_endpoint: env_opt("AZURE_OPENAI_ENDPOINT"),
            azure_openai_api_version: env_or("AZURE_OPENAI_API_VERSION", "2024-12-01-preview"),
            azure_deployment_name: env_opt("AZURE_DEPLOYMENT_NAME"),

            tts_enabled: env_flag("TTS_ENABLED", true),
            tts_model_name: env_or("TTS_MODEL_NAME", "gpt-4o-mini-tts"),
            tts_voice: env_or("TTS_VOICE", "alloy"),

            whatsapp_provider: WhatsAppProvider::parse(&env_or("WHATSAPP_PROVIDER", "waha")),
            whatsapp_fallback_provider: env_opt("WHATSAPP_FALLBACK_PROVIDER")
                .map(|raw| WhatsAppProvider::parse(&raw)),
            whatsapp_sandbox_mode: env_flag("WHATSAPP_SANDBOX_MODE", false),
            waha_base_url: env_opt("WAHA_BASE_URL"),
            waha_api_token: env_opt("WAHA_API_TOKEN"),
            waha_session_name: env_or("WAHA_SESSION_NAME", "default"),
            twilio_account_sid: env_opt("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: env_opt("TWILIO_AUTH_TOKEN"),
            twilio_whatsapp_number: env_opt("TWILIO_WHATSAPP_NUMBER"),

            telegram_enabled: env_flag("TELEGRAM_ENABLED", true),
            telegram_sandbox_mode: env_flag("TELEGRAM_SANDBOX_MODE", false),
            telegram_bot_token: env_opt("TELEGRAM_BOT_TOKEN"),
            telegram_base_url: env_or("TELEGRAM_BASE_URL", "https://api.telegram.org"),
            telegram_webhook_secret: env_opt("TELEGRAM_WEBHOOK_SECRET"),

            api_camara_base_url: env_opt("API_CAMARA_BASE_URL"),
            api_senado_base_url: env_opt("API_SENADO_BASE_URL"),
            source_timeout: Duration::from_secs(env_parse("SOURCE_TIMEOUT_SECS", 10)),

            send_audio_default: env_flag("SEND_AUDIO_DEFAULT", false),
            answer_cache_ttl: Duration::from_secs(env_parse("ANSWER_CACHE_TTL_SECS", 600)),
            user_state_ttl: Duration::from_secs(env_parse("USER_STATE_TTL_SECS", 86_400)),
            seen_message_ttl: Duration::from_secs(env_parse("SEEN_MESSAGE_TTL_SECS", 300)),
            history_max_turns: env_parse("HISTORY_MAX_TURNS", 8),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_flag(name: &str, default: bool) -> bool {
    match env_opt(name) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env_opt(name)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

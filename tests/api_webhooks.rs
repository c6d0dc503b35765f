// tests/api_webhooks.rs
//! Webhook handlers driven in-process through `tower::oneshot`: WAHA filter
//! rules, Telegram secret/greeting/media mapping, inbound dedup, and the
//! 200-with-`delivered:false` policy on delivery failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

use elo_assistant::api::{create_router, AppState};
use elo_assistant::datahub::DataHub;
use elo_assistant::dedup::InboundDedup;
use elo_assistant::delivery::{DeliveryEngine, MessagePort};
use elo_assistant::error::ProviderError;
use elo_assistant::llm::{ChatModel, ChatRequest};
use elo_assistant::orchestrator::AnswerOrchestrator;
use elo_assistant::state::UserStateStore;
use elo_assistant::store::MemoryStore;
use elo_assistant::tts::{AudioRef, SpeechSynthesizer};

struct FixedAnswerModel;

#[async_trait]
impl ChatModel for FixedAnswerModel {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        Ok("resposta do assistente".to_string())
    }
    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

struct OkPort(&'static str);

#[async_trait]
impl MessagePort for OkPort {
    async fn send_text(&self, _to: &str, _text: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn send_audio(&self, _to: &str, _audio_ref: &str) -> Result<(), ProviderError> {
        Ok(())
    }
    fn name(&self) -> &'static str {
        self.0
    }
}

/// Fails with a config error so tests never sit in retry backoff.
struct BrokenPort;

#[async_trait]
impl MessagePort for BrokenPort {
    async fn send_text(&self, _to: &str, _text: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Config("WAHA_BASE_URL"))
    }
    async fn send_audio(&self, _to: &str, _audio_ref: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Config("WAHA_BASE_URL"))
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

struct NoSpeech;

#[async_trait]
impl SpeechSynthesizer for NoSpeech {
    async fn synthesize(&self, _text: &str) -> Result<AudioRef, ProviderError> {
        Err(ProviderError::Config("TTS_ENABLED"))
    }
}

fn app_with(
    whatsapp_port: Arc<dyn MessagePort>,
    telegram_port: Arc<dyn MessagePort>,
    telegram_secret: Option<&str>,
) -> Router {
    let store = Arc::new(MemoryStore::new());
    let datahub = Arc::new(DataHub::from_sources(vec![], vec![], Duration::from_millis(50)));
    let orchestrator = Arc::new(AnswerOrchestrator::new(
        store.clone(),
        Duration::from_secs(600),
        UserStateStore::new(store.clone(), Duration::from_secs(600), 8),
        datahub,
        Arc::new(FixedAnswerModel),
    ));
    let state = AppState {
        orchestrator,
        whatsapp: Arc::new(DeliveryEngine::new(whatsapp_port, None, false)),
        telegram: Arc::new(DeliveryEngine::new(telegram_port, None, false)),
        dedup: Arc::new(InboundDedup::new(store, Duration::from_secs(300))),
        synthesizer: Arc::new(NoSpeech),
        send_audio_default: false,
        telegram_webhook_secret: telegram_secret.map(|s| s.to_string()),
    };
    create_router(state)
}

fn default_app() -> Router {
    app_with(Arc::new(OkPort("waha")), Arc::new(OkPort("telegram")), None)
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    post_json_with_header(app, uri, payload, None).await
}

async fn post_json_with_header(
    app: &Router,
    uri: &str,
    payload: Value,
    secret_header: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(secret) = secret_header {
        builder = builder.header("X-Telegram-Bot-Api-Secret-Token", secret);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(&payload).expect("serialize payload")))
        .expect("request build");

    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn waha_message(id: &str, from: &str, body: &str) -> Value {
    json!({
        "event": "message",
        "payload": { "id": id, "from": from, "to": "bot@c.us", "body": body, "fromMe": false },
        "me": { "id": "bot@c.us" }
    })
}

#[tokio::test]
async fn health_answers_ok() {
    let app = default_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn whatsapp_non_message_events_are_ignored() {
    let app = default_app();
    let (status, body) = post_json(&app, "/webhook/whatsapp", json!({ "event": "session.status" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["reason"], "not_message_event");
}

#[tokio::test]
async fn whatsapp_own_messages_are_ignored() {
    let app = default_app();
    let (_, body) = post_json(
        &app,
        "/webhook/whatsapp",
        json!({
            "event": "message",
            "payload": { "from": "user@c.us", "body": "oi", "fromMe": true }
        }),
    )
    .await;
    assert_eq!(body["reason"], "from_me");
}

#[tokio::test]
async fn whatsapp_group_and_broadcast_senders_are_ignored() {
    let app = default_app();
    for sender in ["grupo@g.us", "canal@newsletter", "lista@broadcast"] {
        let (_, body) = post_json(&app, "/webhook/whatsapp", waha_message("m1", sender, "oi")).await;
        assert_eq!(body["reason"], "not_direct_chat", "sender: {sender}");
    }
}

#[tokio::test]
async fn whatsapp_messages_for_other_targets_are_ignored() {
    let app = default_app();
    let (_, body) = post_json(
        &app,
        "/webhook/whatsapp",
        json!({
            "event": "message",
            "payload": { "from": "user@c.us", "to": "outro@c.us", "body": "oi" },
            "me": { "id": "bot@c.us" }
        }),
    )
    .await;
    assert_eq!(body["reason"], "wrong_target");
}

#[tokio::test]
async fn whatsapp_empty_bodies_are_ignored() {
    let app = default_app();
    let (_, body) = post_json(&app, "/webhook/whatsapp", waha_message("m1", "user@c.us", "   ")).await;
    assert_eq!(body["reason"], "empty_message");
}

#[tokio::test]
async fn whatsapp_happy_path_classifies_and_delivers() {
    let app = default_app();
    let (status, body) =
        post_json(&app, "/webhook/whatsapp", waha_message("m1", "user@c.us", "como tirar o CPF?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["delivered"], true);
    assert_eq!(body["intent"], "elo");
    assert_eq!(body["provider"], "waha");
}

#[tokio::test]
async fn whatsapp_duplicate_message_ids_are_processed_once() {
    let app = default_app();
    let payload = waha_message("wamid.777", "user@c.us", "oi");

    let (_, first) = post_json(&app, "/webhook/whatsapp", payload.clone()).await;
    assert_eq!(first["delivered"], true);

    let (status, second) = post_json(&app, "/webhook/whatsapp", payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "ignored");
    assert_eq!(second["reason"], "duplicate");
}

#[tokio::test]
async fn whatsapp_delivery_failure_still_acknowledges_the_webhook() {
    let app = app_with(Arc::new(BrokenPort), Arc::new(OkPort("telegram")), None);
    let (status, body) =
        post_json(&app, "/webhook/whatsapp", waha_message("m1", "user@c.us", "oi")).await;

    // Transport-level success, failure reported in the body.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["delivered"], false);
    assert_eq!(body["reason"], "provider_error");
    assert_eq!(body["answer_preview"], "resposta do assistente");
}

#[tokio::test]
async fn telegram_secret_mismatch_is_unauthorized() {
    let app = app_with(Arc::new(OkPort("waha")), Arc::new(OkPort("telegram")), Some("s3cret"));
    let payload = json!({ "message": { "message_id": 1, "chat": { "id": 42 }, "text": "oi" } });

    let (status, _) = post_json_with_header(&app, "/webhook/telegram", payload.clone(), Some("errado")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json_with_header(&app, "/webhook/telegram", payload, Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);
}

#[tokio::test]
async fn telegram_text_message_is_answered_with_preview() {
    let app = default_app();
    let (status, body) = post_json(
        &app,
        "/webhook/telegram",
        json!({ "message": { "message_id": 2, "chat": { "id": 123456 }, "text": "como tirar o cpf?" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);
    assert_eq!(body["intent"], "elo");
    assert_eq!(body["answer_preview"], "resposta do assistente");
}

#[tokio::test]
async fn telegram_photo_routes_to_the_oracle_flow() {
    let app = default_app();
    let (_, body) = post_json(
        &app,
        "/webhook/telegram",
        json!({
            "message": {
                "message_id": 3,
                "chat": { "id": 42 },
                "caption": "o que é isso?",
                "photo": [{ "file_id": "abc", "mime_type": null }]
            }
        }),
    )
    .await;
    assert_eq!(body["delivered"], true);
    assert_eq!(body["intent"], "oraculo");
}

#[tokio::test]
async fn telegram_start_command_sends_the_greeting() {
    let app = default_app();
    let (status, body) = post_json(
        &app,
        "/webhook/telegram",
        json!({ "message": { "message_id": 4, "chat": { "id": 42 }, "text": "/start" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);
    assert_eq!(body["intent"], "start");
}

#[tokio::test]
async fn telegram_updates_without_chat_are_ignored() {
    let app = default_app();
    let (_, body) = post_json(&app, "/webhook/telegram", json!({ "message": { "text": "oi" } })).await;
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["reason"], "no_chat");
}

#[tokio::test]
async fn telegram_duplicate_updates_are_processed_once() {
    let app = default_app();
    let payload = json!({ "message": { "message_id": 9, "chat": { "id": 42 }, "text": "oi" } });

    let (_, first) = post_json(&app, "/webhook/telegram", payload.clone()).await;
    assert_eq!(first["delivered"], true);

    let (_, second) = post_json(&app, "/webhook/telegram", payload).await;
    assert_eq!(second["reason"], "duplicate");
}

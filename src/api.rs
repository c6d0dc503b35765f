// src/api.rs
//! HTTP surface: health plus the WhatsApp (WAHA) and Telegram webhooks.
//! Pipeline failures degrade inside the handlers; origin channels retry
//! unacknowledged webhooks aggressively, so anything past JSON parsing
//! answers 200 and reports problems in the body.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::dedup::InboundDedup;
use crate::delivery::{DeliveryEngine, DeliveryMode};
use crate::flows::{dispatch_message, RoutedReply};
use crate::intent::normalize_text;
use crate::llm::prompt::{FALLBACK_AUDIO_MESSAGE, GREETING_MESSAGE};
use crate::message::{MessageKind, NormalizedMessage};
use crate::orchestrator::AnswerOrchestrator;
use crate::tts::{AudioRef, SpeechSynthesizer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnswerOrchestrator>,
    pub whatsapp: Arc<DeliveryEngine>,
    pub telegram: Arc<DeliveryEngine>,
    pub dedup: Arc<InboundDedup>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub send_audio_default: bool,
    pub telegram_webhook_secret: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/webhook/whatsapp", post(whatsapp_webhook))
        .route("/webhook/telegram", post(telegram_webhook))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn ignored(reason: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ignored", "reason": reason })))
}

fn undelivered(reason: &str, reply: Option<&RoutedReply>) -> (StatusCode, Json<Value>) {
    let mut body = json!({ "status": "ok", "delivered": false, "reason": reason });
    if let Some(routed) = reply {
        body["answer_preview"] = json!(routed.text);
        body["intent"] = json!(routed.intent.as_str());
    }
    (StatusCode::OK, Json(body))
}

/// Best-effort synthesis; failure means text-only delivery, never an error.
async fn synthesize_if_wanted(state: &AppState, mode: DeliveryMode, text: &str) -> Option<AudioRef> {
    let wants = match mode {
        DeliveryMode::Text => false,
        DeliveryMode::TextAndAudio => true,
        DeliveryMode::Auto => state.send_audio_default,
    };
    if !wants {
        return None;
    }
    match state.synthesizer.synthesize(text).await {
        Ok(audio) => Some(audio),
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis failed, delivering text only");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// WhatsApp (WAHA event envelope)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WahaEvent {
    event: Option<String>,
    #[serde(default)]
    payload: WahaPayload,
    me: Option<WahaMe>,
}

#[derive(Debug, Default, Deserialize)]
struct WahaPayload {
    id: Option<String>,
    from: Option<String>,
    to: Option<String>,
    body: Option<String>,
    #[serde(rename = "fromMe", default)]
    from_me: bool,
}

#[derive(Debug, Deserialize)]
struct WahaMe {
    id: Option<String>,
}

const ILLEGAL_SENDERS: [&str; 3] = ["@newsletter", "@g.us", "@broadcast"];

async fn whatsapp_webhook(
    State(state): State<AppState>,
    Json(event): Json<WahaEvent>,
) -> (StatusCode, Json<Value>) {
    let kind = event.event.as_deref().unwrap_or_default();
    if kind != "message" && kind != "message.any" {
        return ignored("not_message_event");
    }

    let payload = event.payload;
    if payload.from_me {
        return ignored("from_me");
    }

    let Some(from) = payload.from.filter(|f| !f.is_empty()) else {
        return ignored("no_sender");
    };
    if ILLEGAL_SENDERS.iter().any(|tag| from.contains(tag)) {
        tracing::info!(%from, "ignoring automated/channel sender");
        return ignored("not_direct_chat");
    }

    if let Some(bot_id) = event.me.and_then(|me| me.id) {
        if payload.to.as_deref() != Some(bot_id.as_str()) {
            tracing::info!(to = ?payload.to, bot = %bot_id, "ignoring message not addressed to the bot");
            return ignored("wrong_target");
        }
    }

    let body = payload.body.unwrap_or_default().trim().to_string();
    if body.is_empty() {
        return ignored("empty_message");
    }

    if let Some(message_id) = payload.id.filter(|id| !id.is_empty()) {
        if state.dedup.is_duplicate(&message_id).await {
            return ignored("duplicate");
        }
    }

    let normalized = normalize_text(&body);
    tracing::info!(user_id = %from, "whatsapp message accepted");
    let mut message = NormalizedMessage::text(from, normalized);
    message.provider = Some("whatsapp".to_string());

    let routed = dispatch_message(&state.orchestrator, &message).await;

    let mode = if state.send_audio_default {
        DeliveryMode::TextAndAudio
    } else {
        DeliveryMode::Text
    };
    let audio_ref = synthesize_if_wanted(&state, mode, &routed.text).await;

    match state
        .whatsapp
        .deliver(&message.user_id, &routed.text, audio_ref.as_ref(), mode)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "delivered": true,
                "intent": routed.intent.as_str(),
                "provider": receipt.provider_used,
                "audio_sent": receipt.audio_sent,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "whatsapp delivery failed");
            undelivered("provider_error", Some(&routed))
        }
    }
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    message: Option<TelegramMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramMessage {
    message_id: Option<i64>,
    chat: Option<TelegramChat>,
    text: Option<String>,
    caption: Option<String>,
    #[serde(default)]
    photo: Vec<TelegramAttachment>,
    document: Option<TelegramAttachment>,
    voice: Option<TelegramAttachment>,
    audio: Option<TelegramAttachment>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TelegramAttachment {
    #[allow(dead_code)]
    file_id: Option<String>,
    mime_type: Option<String>,
}

const AUDIO_REQUEST_KEYWORDS: [&str; 7] =
    ["audio", "áudio", "voz", "falar", "ouvir", "fala", "explique falando"];

fn telegram_media(message: &TelegramMessage) -> (MessageKind, Option<String>) {
    if !message.photo.is_empty() {
        return (MessageKind::Image, Some("image/jpeg".to_string()));
    }
    if let Some(doc) = &message.document {
        return (MessageKind::File, doc.mime_type.clone());
    }
    if let Some(voice) = &message.voice {
        return (
            MessageKind::Audio,
            voice.mime_type.clone().or_else(|| Some("audio/ogg".to_string())),
        );
    }
    if let Some(audio) = &message.audio {
        return (MessageKind::Audio, audio.mime_type.clone());
    }
    (MessageKind::Text, None)
}

async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> (StatusCode, Json<Value>) {
    if let Some(secret) = &state.telegram_webhook_secret {
        let header = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok());
        if header != Some(secret.as_str()) {
            tracing::warn!("telegram webhook secret mismatch");
            return (StatusCode::UNAUTHORIZED, Json(json!({ "status": "forbidden" })));
        }
    }

    let message = update.message.unwrap_or_default();
    let Some(chat_id) = message.chat.as_ref().and_then(|c| c.id) else {
        return ignored("no_chat");
    };
    let user_id = format!("tg:{chat_id}");

    if let Some(message_id) = message.message_id {
        if state.dedup.is_duplicate(&format!("{user_id}:{message_id}")).await {
            return ignored("duplicate");
        }
    }

    let raw_text = message
        .text
        .clone()
        .or_else(|| message.caption.clone())
        .unwrap_or_default();
    let normalized = normalize_text(&raw_text);
    let (kind, mime_type) = telegram_media(&message);

    let normalized_message = NormalizedMessage {
        user_id: user_id.clone(),
        kind,
        text: (!normalized.is_empty()).then(|| normalized.clone()),
        media_url: None,
        media_bytes: None,
        mime_type,
        provider: Some("telegram".to_string()),
    };

    // First contact: fixed greeting, spoken and written.
    if normalized == "/start" {
        let audio = synthesize_if_wanted(&state, DeliveryMode::TextAndAudio, GREETING_MESSAGE).await;
        return match state
            .telegram
            .deliver(&user_id, GREETING_MESSAGE, audio.as_ref(), DeliveryMode::TextAndAudio)
            .await
        {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({ "status": "ok", "delivered": true, "intent": "start" })),
            ),
            Err(e) => {
                tracing::error!(error = %e, "telegram greeting failed");
                undelivered("greeting_failed", None)
            }
        };
    }

    // Voice note with no caption and no transcript: answer with the fixed
    // audio-unavailable sentence instead of a blind model call.
    let routed = if kind == MessageKind::Audio && normalized.is_empty() {
        RoutedReply {
            text: FALLBACK_AUDIO_MESSAGE.to_string(),
            intent: crate::intent::Intent::Oracle,
            bot_name: crate::llm::prompt::BOT_NAME,
            success: false,
        }
    } else {
        dispatch_message(&state.orchestrator, &normalized_message).await
    };

    let user_wants_audio = AUDIO_REQUEST_KEYWORDS.iter().any(|k| normalized.contains(k));
    let mode = if kind == MessageKind::Audio || state.send_audio_default || user_wants_audio {
        DeliveryMode::TextAndAudio
    } else {
        DeliveryMode::Text
    };
    let audio_ref = synthesize_if_wanted(&state, mode, &routed.text).await;

    match state
        .telegram
        .deliver(&user_id, &routed.text, audio_ref.as_ref(), mode)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "delivered": true,
                "answer_preview": routed.text,
                "intent": routed.intent.as_str(),
                "audio_sent": receipt.audio_sent,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "telegram delivery failed");
            undelivered("provider_error", Some(&routed))
        }
    }
}

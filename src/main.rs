//! ELO Assistant — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the answer pipeline, delivery engines
//! and shared stores once at process start.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use elo_assistant::api::{self, AppState};
use elo_assistant::config::{Settings, WhatsAppProvider};
use elo_assistant::datahub::DataHub;
use elo_assistant::dedup::InboundDedup;
use elo_assistant::delivery::{
    console::ConsolePort, telegram::TelegramPort, twilio::TwilioPort, waha::WahaPort,
    DeliveryEngine, MessagePort,
};
use elo_assistant::llm;
use elo_assistant::metrics::Metrics;
use elo_assistant::orchestrator::AnswerOrchestrator;
use elo_assistant::state::UserStateStore;
use elo_assistant::store::MemoryStore;
use elo_assistant::tts;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("elo_assistant=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn whatsapp_port(provider: WhatsAppProvider, settings: &Settings) -> Arc<dyn MessagePort> {
    match provider {
        WhatsAppProvider::Waha => Arc::new(WahaPort::from_settings(settings)),
        WhatsAppProvider::Twilio => Arc::new(TwilioPort::from_settings(settings)),
        WhatsAppProvider::Console => Arc::new(ConsolePort),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env();

    // Shared store: answer cache, user state and dedup markers all live
    // here. Expired entries are pruned on a background interval.
    let store = Arc::new(MemoryStore::new());
    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                store.prune();
            }
        });
    }

    let datahub = Arc::new(DataHub::new(&settings));
    let model = llm::build_chat_model(&settings);
    tracing::info!(provider = model.provider_name(), "chat model configured");

    let user_states = UserStateStore::new(
        store.clone(),
        settings.user_state_ttl,
        settings.history_max_turns,
    );
    let orchestrator = Arc::new(AnswerOrchestrator::new(
        store.clone(),
        settings.answer_cache_ttl,
        user_states,
        datahub,
        model,
    ));

    let primary = whatsapp_port(settings.whatsapp_provider, &settings);
    let fallback = settings
        .whatsapp_fallback_provider
        .map(|p| whatsapp_port(p, &settings));
    let whatsapp = Arc::new(DeliveryEngine::new(
        primary,
        fallback,
        settings.send_audio_default,
    ));
    let telegram = Arc::new(DeliveryEngine::new(
        Arc::new(TelegramPort::from_settings(&settings)),
        None,
        settings.send_audio_default,
    ));

    let state = AppState {
        orchestrator,
        whatsapp,
        telegram,
        dedup: Arc::new(InboundDedup::new(store.clone(), settings.seen_message_ttl)),
        synthesizer: tts::build_synthesizer(&settings),
        send_audio_default: settings.send_audio_default,
        telegram_webhook_secret: settings.telegram_webhook_secret.clone(),
    };

    let metrics = Metrics::init(settings.answer_cache_ttl.as_secs());
    let router = api::create_router(state).merge(metrics.router());

    let addr = format!("{}:{}", settings.app_host, settings.app_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await.context("server exited")?;
    Ok(())
}

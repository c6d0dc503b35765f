// src/delivery/mod.rs
//! Delivery engine: text first with per-provider retry budgets, optional
//! best-effort audio, and a secondary provider once the primary path is
//! exhausted. The console port is terminal-only and never enters a fallback
//! chain.

pub mod console;
pub mod telegram;
pub mod twilio;
pub mod waha;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::error::{DeliveryFailure, ProviderError};
use crate::tts::AudioRef;

#[async_trait]
pub trait MessagePort: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), ProviderError>;
    async fn send_audio(&self, to: &str, audio_ref: &str) -> Result<(), ProviderError>;
    fn name(&self) -> &'static str;
    /// Local/debug ports answer true; they neither fall back nor receive
    /// fallback traffic.
    fn is_local(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Text,
    TextAndAudio,
    /// Resolves through the configured default.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub provider_used: &'static str,
    pub audio_sent: bool,
}

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(8);

fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE
        .saturating_mul(1u32 << (attempt - 1).min(8))
        .min(BACKOFF_CAP)
}

pub struct DeliveryEngine {
    primary: Arc<dyn MessagePort>,
    fallback: Option<Arc<dyn MessagePort>>,
    send_audio_default: bool,
}

impl DeliveryEngine {
    pub fn new(
        primary: Arc<dyn MessagePort>,
        fallback: Option<Arc<dyn MessagePort>>,
        send_audio_default: bool,
    ) -> Self {
        Self {
            primary,
            fallback,
            send_audio_default,
        }
    }

    fn wants_audio(&self, mode: DeliveryMode) -> bool {
        match mode {
            DeliveryMode::Text => false,
            DeliveryMode::TextAndAudio => true,
            DeliveryMode::Auto => self.send_audio_default,
        }
    }

    /// Text delivery is mandatory; audio rides along best-effort and its
    /// failure never fails the call.
    pub async fn deliver(
        &self,
        to: &str,
        text: &str,
        audio_ref: Option<&AudioRef>,
        mode: DeliveryMode,
    ) -> Result<DeliveryReceipt, DeliveryFailure> {
        let provider: &Arc<dyn MessagePort> = match self.send_with_retry(&self.primary, to, text).await {
            Ok(()) => &self.primary,
            Err(primary_err) => match &self.fallback {
                Some(fallback) if !self.primary.is_local() && !fallback.is_local() => {
                    counter!("delivery_fallback_total").increment(1);
                    tracing::warn!(
                        primary = self.primary.name(),
                        fallback = fallback.name(),
                        error = %primary_err,
                        "primary provider exhausted, switching to fallback"
                    );
                    match self.send_with_retry(fallback, to, text).await {
                        Ok(()) => fallback,
                        Err(fallback_err) => {
                            counter!("delivery_failures_total").increment(1);
                            return Err(DeliveryFailure {
                                provider: fallback.name(),
                                source: fallback_err,
                            });
                        }
                    }
                }
                _ => {
                    counter!("delivery_failures_total").increment(1);
                    return Err(DeliveryFailure {
                        provider: self.primary.name(),
                        source: primary_err,
                    });
                }
            },
        };

        let mut audio_sent = false;
        if self.wants_audio(mode) {
            if let Some(AudioRef(audio)) = audio_ref {
                match provider.send_audio(to, audio).await {
                    Ok(()) => audio_sent = true,
                    Err(e) => {
                        tracing::warn!(
                            provider = provider.name(),
                            error = %e,
                            "audio delivery failed, text already sent"
                        );
                    }
                }
            }
        }

        Ok(DeliveryReceipt {
            provider_used: provider.name(),
            audio_sent,
        })
    }

    async fn send_with_retry(
        &self,
        port: &Arc<dyn MessagePort>,
        to: &str,
        text: &str,
    ) -> Result<(), ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            counter!("delivery_attempts_total").increment(1);
            match port.send_text(to, text).await {
                Ok(()) => return Ok(()),
                Err(e @ ProviderError::Auth(_)) => {
                    // Terminal: retrying an auth rejection only masks later
                    // errors behind the same 401s.
                    tracing::warn!(
                        provider = port.name(),
                        error = %e,
                        "authorization rejected, not retrying"
                    );
                    return Err(e);
                }
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let delay = backoff(attempt);
                    tracing::warn!(
                        provider = port.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

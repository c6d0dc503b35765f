// src/delivery/console.rs
//! Console echo port for local runs. Always succeeds; marked local so the
//! engine never chains it with real providers.

use async_trait::async_trait;

use super::MessagePort;
use crate::error::ProviderError;

pub struct ConsolePort;

#[async_trait]
impl MessagePort for ConsolePort {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        tracing::info!(to, msg = text, "[CONSOLE-OUT]");
        Ok(())
    }

    async fn send_audio(&self, to: &str, audio_ref: &str) -> Result<(), ProviderError> {
        tracing::info!(to, file = audio_ref, "[CONSOLE-OUT-AUDIO]");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }

    fn is_local(&self) -> bool {
        true
    }
}

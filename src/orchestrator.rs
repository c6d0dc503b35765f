// src/orchestrator.rs
//! Answer orchestration: cache-first lookup, grounding selection,
//! conversation-history assembly, chat-model call with bounded retry, and
//! the fixed fallback when everything is exhausted. Always produces a
//! string; failures never propagate past this layer.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::datahub::types::SourceSet;
use crate::datahub::{mock, DataHub};
use crate::intent::{self, Intent};
use crate::llm::prompt::{self, FALLBACK_LLM_MESSAGE, ORACLE_GROUNDING};
use crate::llm::{self, ChatModel};
use crate::state::UserStateStore;
use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
pub struct AnswerRequest<'a> {
    pub user_id: &'a str,
    pub question: &'a str,
    pub intent: Intent,
    /// Image reference forwarded to the model on the Oracle flow.
    pub media_url: Option<&'a str>,
    /// Caller-supplied extracted content (document text, transcript, image
    /// description). Oracle grounding; never populated by the aggregator.
    pub extracted_content: Option<&'a str>,
}

impl<'a> AnswerRequest<'a> {
    pub fn text(user_id: &'a str, question: &'a str, intent: Intent) -> Self {
        Self {
            user_id,
            question,
            intent,
            media_url: None,
            extracted_content: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOrigin {
    Cache,
    Model,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub text: String,
    pub success: bool,
    pub origin: AnswerOrigin,
}

pub struct AnswerOrchestrator {
    cache: Arc<dyn KeyValueStore>,
    cache_ttl: Duration,
    user_states: UserStateStore,
    datahub: Arc<DataHub>,
    model: Arc<dyn ChatModel>,
}

impl AnswerOrchestrator {
    pub fn new(
        cache: Arc<dyn KeyValueStore>,
        cache_ttl: Duration,
        user_states: UserStateStore,
        datahub: Arc<DataHub>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            cache,
            cache_ttl,
            user_states,
            datahub,
            model,
        }
    }

    pub async fn answer(&self, request: &AnswerRequest<'_>) -> AnswerOutcome {
        let normalized = intent::normalize_text(request.question);
        let key = cache_key(request.user_id, request.intent, &normalized);

        // Cache hit short-circuits everything: no model call, no history
        // update.
        if let Some(cached) = self.cache.get(&key).await {
            tracing::info!(user_id = request.user_id, "answer cache hit");
            return AnswerOutcome {
                text: cached,
                success: true,
                origin: AnswerOrigin::Cache,
            };
        }

        let grounding = self.grounding_for(request, &normalized).await;
        let state = self.user_states.load(request.user_id).await;
        let chat_request = prompt::build_chat_request(
            request.intent,
            &normalized,
            &grounding,
            &state.history,
            request.media_url,
        );

        match llm::complete_with_retry(self.model.as_ref(), &chat_request).await {
            Ok(answer) => {
                self.cache.set(&key, &answer, self.cache_ttl).await;
                let mut state = state;
                self.user_states
                    .record_exchange(request.user_id, &mut state, &normalized, &answer)
                    .await;
                AnswerOutcome {
                    text: answer,
                    success: true,
                    origin: AnswerOrigin::Model,
                }
            }
            Err(e) => {
                tracing::warn!(
                    user_id = request.user_id,
                    provider = self.model.provider_name(),
                    error = %e,
                    "chat model unavailable, returning fallback"
                );
                // Fallbacks are never cached and never enter history.
                AnswerOutcome {
                    text: FALLBACK_LLM_MESSAGE.to_string(),
                    success: false,
                    origin: AnswerOrigin::Fallback,
                }
            }
        }
    }

    /// Grounding strategy per flow. Oracle never touches the aggregator;
    /// Legislative always uses the legislative pair; Civic upgrades to the
    /// legislative pair only when the legal-topic heuristic fires.
    async fn grounding_for(&self, request: &AnswerRequest<'_>, normalized: &str) -> String {
        match request.intent {
            Intent::Oracle => request
                .extracted_content
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .unwrap_or_else(|| ORACLE_GROUNDING.to_string()),
            Intent::Legislative => {
                let docs = self.datahub.aggregate(normalized, SourceSet::Legislative).await;
                prompt::grounding_block(&docs)
            }
            Intent::Civic => {
                if intent::mentions_legal_topic(normalized) {
                    let docs = self.datahub.aggregate(normalized, SourceSet::Legislative).await;
                    prompt::grounding_block(&docs)
                } else {
                    prompt::grounding_block(&mock::search(normalized))
                }
            }
        }
    }
}

fn cache_key(user_id: &str, intent: Intent, normalized_question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{user_id}:{}:{normalized_question}", intent.as_str()).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

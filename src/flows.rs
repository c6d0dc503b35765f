// src/flows.rs
//! Flow dispatch. The intent enum is matched exhaustively, so adding a flow
//! is a compile-time change. Handlers only produce the reply; delivery is
//! the webhook layer's job.

use crate::intent::{self, Intent};
use crate::llm::prompt::BOT_NAME;
use crate::message::NormalizedMessage;
use crate::orchestrator::{AnswerOrchestrator, AnswerOutcome, AnswerRequest};

#[derive(Debug, Clone)]
pub struct RoutedReply {
    pub text: String,
    pub intent: Intent,
    pub bot_name: &'static str,
    /// False when the fixed fallback sentence stood in for a real answer.
    pub success: bool,
}

pub async fn dispatch_message(
    orchestrator: &AnswerOrchestrator,
    message: &NormalizedMessage,
) -> RoutedReply {
    let intent = intent::classify(message);
    tracing::info!(user_id = %message.user_id, intent = %intent, "routing message");

    let outcome = match intent {
        Intent::Civic => handle_civic(orchestrator, message).await,
        Intent::Legislative => handle_legislative(orchestrator, message).await,
        Intent::Oracle => handle_oracle(orchestrator, message).await,
    };

    RoutedReply {
        text: outcome.text,
        intent,
        bot_name: BOT_NAME,
        success: outcome.success,
    }
}

async fn handle_civic(
    orchestrator: &AnswerOrchestrator,
    message: &NormalizedMessage,
) -> AnswerOutcome {
    orchestrator
        .answer(&AnswerRequest::text(
            &message.user_id,
            message.text_or_empty(),
            Intent::Civic,
        ))
        .await
}

async fn handle_legislative(
    orchestrator: &AnswerOrchestrator,
    message: &NormalizedMessage,
) -> AnswerOutcome {
    orchestrator
        .answer(&AnswerRequest::text(
            &message.user_id,
            message.text_or_empty(),
            Intent::Legislative,
        ))
        .await
}

async fn handle_oracle(
    orchestrator: &AnswerOrchestrator,
    message: &NormalizedMessage,
) -> AnswerOutcome {
    // The question may be a caption or a transcript; extracted document
    // content, when a caller has it, rides in as oracle grounding.
    let request = AnswerRequest {
        user_id: &message.user_id,
        question: message.text_or_empty(),
        intent: Intent::Oracle,
        media_url: message.media_url.as_deref(),
        extracted_content: None,
    };
    orchestrator.answer(&request).await
}

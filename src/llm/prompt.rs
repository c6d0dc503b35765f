// src/llm/prompt.rs
//! Prompt assembly: base system prompt, per-flow instructions and the
//! federated grounding block. All user-facing text is Brazilian Portuguese.

use crate::datahub::types::SourceDocument;
use crate::intent::Intent;
use crate::state::{Role, Turn};

use super::{ChatMessage, ChatRequest, ChatRole};

pub const BOT_NAME: &str = "ELO – Assistente Cidadão";

/// Fixed polite sentence returned when the chat model cannot be reached.
pub const FALLBACK_LLM_MESSAGE: &str =
    "Tive um problema para acessar o modelo de IA agora. Tente de novo em alguns instantes.";

/// Fixed polite sentence used when an inbound audio could not be understood.
pub const FALLBACK_AUDIO_MESSAGE: &str =
    "Não consegui entender esse áudio. Pode tentar falar de novo?";

/// First-contact greeting (`/start` on Telegram).
pub const GREETING_MESSAGE: &str = "Olá! Eu sou o ELO, seu assistente virtual. \
Estou aqui para te ajudar a entender documentos, leis e serviços públicos de um jeito simples e direto. \
Pode me mandar áudio, imagem ou texto que eu te respondo. Como posso te ajudar hoje?";

const BASE_SYSTEM_PROMPT: &str = "Você é um assistente cidadão brasileiro. \
Responda sempre em português brasileiro claro e acessível. \
Seja direto, educado e não invente informações que não estejam no contexto fornecido.";

/// Grounding line used by the Oracle flow when no extracted content exists.
pub const ORACLE_GROUNDING: &str =
    "(Modo Oráculo: Responda com base no arquivo/áudio/imagem enviado pelo usuário)";

const DOCUMENT_REINFORCEMENT: &str = "Use os documentos reais abaixo, vindos de fontes públicas \
brasileiras (Câmara, Senado, Diários, etc.), como base da sua resposta. Explique em linguagem \
simples o que eles significam para a vida do cidadão.";

const EMPTY_CONTEXT_LINE: &str = "- Sem contexto externo; responda com orientação geral e clara.";

const GROUNDING_DOC_LIMIT: usize = 5;
const SUMMARY_MAX_CHARS: usize = 240;

fn flow_instructions(intent: Intent) -> &'static str {
    match intent {
        Intent::Civic => {
            "Ajude o cidadão a entender serviços públicos, documentos e direitos do dia a dia."
        }
        Intent::Legislative => {
            "Explique votações, projetos de lei e o trabalho do Congresso de forma imparcial."
        }
        Intent::Oracle => {
            "Analise o conteúdo enviado (documento, imagem ou áudio) e explique em linguagem simples."
        }
    }
}

/// Word-boundary shortening so grounding lines stay scannable.
fn shorten_summary(text: &str) -> String {
    let simplified = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if simplified.chars().count() <= SUMMARY_MAX_CHARS {
        return simplified;
    }
    let cut: String = simplified.chars().take(SUMMARY_MAX_CHARS).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) => &cut[..pos],
        None => cut.as_str(),
    };
    format!("{trimmed}...")
}

/// One line per document: `- {id} ({year}): {title}. {summary}`.
pub fn grounding_block(documents: &[SourceDocument]) -> String {
    documents
        .iter()
        .take(GROUNDING_DOC_LIMIT)
        .map(|doc| {
            let year_label = doc
                .year
                .as_deref()
                .filter(|y| !y.is_empty())
                .map(|y| format!(" ({y})"))
                .unwrap_or_default();
            format!(
                "- {}{}: {}. {}",
                doc.id,
                year_label,
                doc.title,
                shorten_summary(&doc.summary)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles the provider-agnostic message set: system instructions, bounded
/// history, then the question with its grounding context.
pub fn build_chat_request(
    intent: Intent,
    question: &str,
    grounding: &str,
    history: &[Turn],
    image_url: Option<&str>,
) -> ChatRequest {
    let mut system = format!("{BASE_SYSTEM_PROMPT}\nBot: {BOT_NAME}\n{}\n", flow_instructions(intent));
    if intent != Intent::Oracle {
        system.push_str(DOCUMENT_REINFORCEMENT);
    }

    let mut messages = vec![ChatMessage::new(ChatRole::System, system)];
    for turn in history {
        let role = match turn.role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        };
        messages.push(ChatMessage::new(role, turn.content.clone()));
    }

    let context = if grounding.is_empty() {
        EMPTY_CONTEXT_LINE
    } else {
        grounding
    };
    messages.push(ChatMessage::new(
        ChatRole::User,
        format!(
            "Pergunta do usuário: {question}\n\
             Contexto federado (resuma em poucas linhas):\n{context}\n\
             Responda em português brasileiro simples, frases curtas, e inclua um exemplo prático \
             quando ajudar a entender."
        ),
    ));

    ChatRequest {
        messages,
        temperature: 0.3,
        image_url: image_url.map(|u| u.to_string()),
    }
}

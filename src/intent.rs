// src/intent.rs
//! Deterministic intent classification. No model call, no state: the result
//! gates which (possibly expensive) downstream pipeline runs, so it must be
//! instantaneous and explainable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::message::NormalizedMessage;

/// Conversational mode. Closed set: adding a flow is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// General citizen assistance (greetings, services, default bucket).
    Civic,
    /// Bills, votes, parliament.
    Legislative,
    /// Media understanding: documents, images, audio, links.
    Oracle,
}

impl Intent {
    /// Wire label used in webhook response bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Civic => "elo",
            Intent::Legislative => "votos",
            Intent::Oracle => "oraculo",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static intent pattern"))
        .collect()
}

/// Links and media talk in plain text.
static ORACLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"https?://\S+",
        r"\b(youtube\.com|youtu\.be)\b",
        r"\b(noticia|notícia|reportagem|materia|matéria)\b",
        r"\b(video|vídeo|foto|imagem|audio|áudio)\b",
        r"\b(analise|análise|resuma|resumo|explique este)\b",
    ])
});

/// Legislative context: bill ids, votes, parliamentarians, houses, sessions.
static LEGISLATIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\b(pl|pec|plp|pln|pdl)\s*\d+",
        r"\b(votação|votacao|voto|votou|votar)\b",
        r"\b(deputado|deputada|senador|senadora|parlamentar)\b",
        r"\b(camara|câmara|senado|congresso|legislativo)\b",
        r"\b(projeto|projetos|proposição|proposicao)\b",
        r"\b(tramitação|tramitacao|relator|comissão|comissao|ccj)\b",
        r"\b(projeto de lei|proposta|ementa|inteiro teor)\b",
        r"\b(sessão|sessao|plenário|plenario|pauta)\b",
        r"\b(partido|bancada|liderança|lideranca)\b",
    ])
});

/// Legal/benefit terms that upgrade CIVIC grounding from the built-in
/// catalog to the legislative source set. Plain substring check over the
/// normalized question; kept deliberately loose.
const CIVIC_LEGAL_KEYWORDS: &[&str] = &[
    "lei",
    "direito",
    "beneficio",
    "benefício",
    "auxilio",
    "auxílio",
    "bolsa familia",
    "bolsa família",
    "inss",
    "aposentadoria",
    "fgts",
    "seguro desemprego",
    "imposto",
    "irpf",
];

/// Lower-case and collapse internal whitespace. Shared with the answer
/// cache key so identical questions hash identically.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Pure classification. First match wins:
/// 1. any media kind or a media URL → Oracle (media always beats keywords);
/// 2. link/media keywords in plain text → Oracle;
/// 3. legislative keywords → Legislative;
/// 4. everything else → Civic. The system always picks a flow.
pub fn classify(message: &NormalizedMessage) -> Intent {
    if message.kind.is_media() || message.media_url.as_deref().is_some_and(|u| !u.is_empty()) {
        return Intent::Oracle;
    }

    let normalized = normalize_text(message.text_or_empty());

    if ORACLE_PATTERNS.iter().any(|re| re.is_match(&normalized)) {
        return Intent::Oracle;
    }
    if LEGISLATIVE_PATTERNS.iter().any(|re| re.is_match(&normalized)) {
        return Intent::Legislative;
    }
    Intent::Civic
}

/// CIVIC-flow grounding heuristic (documented, substring-level).
pub fn mentions_legal_topic(normalized_text: &str) -> bool {
    CIVIC_LEGAL_KEYWORDS.iter().any(|k| normalized_text.contains(k))
}

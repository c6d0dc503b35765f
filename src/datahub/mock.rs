// src/datahub/mock.rs
//! Built-in civic document catalog. Grounds CIVIC answers when the legal
//! heuristic does not fire, and doubles as a deterministic source for tests.

use async_trait::async_trait;
use once_cell::sync::Lazy;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

static CIVIC_CATALOG: Lazy<Vec<SourceDocument>> = Lazy::new(|| {
    vec![
        SourceDocument {
            id: "MOCK-001".to_string(),
            title: "Direitos básicos do cidadão".to_string(),
            summary: "Todo cidadão tem direito a atendimento e informação clara nos órgãos públicos."
                .to_string(),
            year: Some("2024".to_string()),
            source: SourceName::Mock,
            link: String::new(),
        },
        SourceDocument {
            id: "MOCK-002".to_string(),
            title: "Acesso à informação".to_string(),
            summary: "Lei de Acesso à Informação garante transparência e resposta ágil do governo."
                .to_string(),
            year: Some("2023".to_string()),
            source: SourceName::Mock,
            link: String::new(),
        },
        SourceDocument {
            id: "MOCK-003".to_string(),
            title: "Participação social".to_string(),
            summary: "Cidadãos podem propor ideias legislativas e participar de audiências públicas."
                .to_string(),
            year: Some("2022".to_string()),
            source: SourceName::Mock,
            link: String::new(),
        },
    ]
});

/// Filters the catalog by substring against the summary; an empty or
/// unmatched query returns the whole catalog rather than nothing.
pub fn search(query: &str) -> Vec<SourceDocument> {
    if query.is_empty() {
        return CIVIC_CATALOG.clone();
    }
    let q = query.to_lowercase();
    let filtered: Vec<SourceDocument> = CIVIC_CATALOG
        .iter()
        .filter(|doc| doc.summary.to_lowercase().contains(&q))
        .cloned()
        .collect();
    if filtered.is_empty() {
        CIVIC_CATALOG.clone()
    } else {
        filtered
    }
}

pub struct MockSource;

#[async_trait]
impl DataSource for MockSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        Ok(search(query))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_query_returns_full_catalog() {
        assert_eq!(search("zzz nada a ver").len(), 3);
    }

    #[test]
    fn matching_query_filters_by_summary() {
        let docs = search("transparência");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "MOCK-002");
    }
}

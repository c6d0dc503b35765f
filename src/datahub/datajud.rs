// src/datahub/datajud.rs
//! Judiciary-data source (DataJud/CNJ). Curated catalog matched by query
//! keywords, same contract as the HTTP fetchers.

use async_trait::async_trait;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

pub struct DatajudSource;

#[async_trait]
impl DataSource for DatajudSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        tracing::debug!(query, "datahub: querying datajud catalog");
        let q = query.to_lowercase();

        let mut results = Vec::new();
        if q.contains("processo") || q.contains("justica") || q.contains("justiça") {
            results.push(SourceDocument {
                id: "CNJ-METAS-2024".to_string(),
                title: "Metas Nacionais do Poder Judiciário 2024".to_string(),
                summary:
                    "Prioridade para julgamento de processos de violência doméstica e feminicídio."
                        .to_string(),
                year: Some("2024".to_string()),
                source: SourceName::Datajud,
                link: "https://www.cnj.jus.br/pesquisas-judiciarias/datajud/".to_string(),
            });
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "datajud"
    }
}

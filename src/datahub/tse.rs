// src/datahub/tse.rs
//! Electoral-data source (TSE). Curated catalog matched by query keywords;
//! answers without network I/O but honors the regular fetcher contract.

use async_trait::async_trait;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

pub struct TseSource;

#[async_trait]
impl DataSource for TseSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        tracing::debug!(query, "datahub: querying tse catalog");
        let q = query.to_lowercase();

        let mut results = Vec::new();
        if q.contains("eleicao") || q.contains("eleição") || q.contains("urna") {
            results.push(SourceDocument {
                id: "TSE-2024-RES".to_string(),
                title: "Calendário Eleitoral 2024".to_string(),
                summary: "Resolução TSE nº 23.738/2024 define datas das eleições municipais."
                    .to_string(),
                year: Some("2024".to_string()),
                source: SourceName::Tse,
                link: "https://www.tse.jus.br/".to_string(),
            });
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "tse"
    }
}

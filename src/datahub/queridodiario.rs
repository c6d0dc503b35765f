// src/datahub/queridodiario.rs
//! Querido Diário (Open Knowledge Brasil) official-gazette search.

use async_trait::async_trait;
use serde::Deserialize;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

const BASE_URL: &str = "https://queridodiario.ok.org.br";
const PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
struct GazetteResponse {
    #[serde(default, alias = "data")]
    results: Vec<GazetteItem>,
}

#[derive(Debug, Deserialize)]
struct GazetteItem {
    id: Option<serde_json::Value>,
    territory_id: Option<String>,
    edition: Option<String>,
    title: Option<String>,
    #[serde(alias = "excerpt")]
    content: Option<String>,
    #[serde(alias = "data_publicacao", alias = "published_at")]
    date: Option<String>,
    url: Option<String>,
    #[serde(alias = "file_url")]
    link: Option<String>,
}

pub struct QueridoDiarioSource {
    http: reqwest::Client,
}

impl QueridoDiarioSource {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

impl Default for QueridoDiarioSource {
    fn default() -> Self {
        Self::new()
    }
}

fn item_id(item: &GazetteItem) -> String {
    match &item.id {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => item
            .territory_id
            .clone()
            .or_else(|| item.edition.clone())
            .unwrap_or_default(),
    }
}

#[async_trait]
impl DataSource for QueridoDiarioSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        let endpoint = format!("{BASE_URL}/api/v1/publicacoes/");
        tracing::debug!(%endpoint, query, "datahub: querying querido diario");

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&endpoint)
            .query(&[("querystring", query), ("page_size", page_size.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let payload: GazetteResponse = response
            .json()
            .await
            .map_err(|e| SourceFetchError::Malformed(e.to_string()))?;

        let docs = payload
            .results
            .into_iter()
            .filter_map(|item| {
                let id = item_id(&item);
                if id.is_empty() {
                    return None;
                }
                Some(SourceDocument {
                    id,
                    title: item
                        .title
                        .clone()
                        .unwrap_or_else(|| "Publicação em Diário Oficial".to_string()),
                    summary: item.content.clone().unwrap_or_default(),
                    year: item.date.clone(),
                    source: SourceName::QueridoDiario,
                    link: item
                        .url
                        .clone()
                        .or_else(|| item.link.clone())
                        .unwrap_or_else(|| BASE_URL.to_string()),
                })
            })
            .collect();
        Ok(docs)
    }

    fn name(&self) -> &'static str {
        "queridodiario"
    }
}

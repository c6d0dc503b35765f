// src/datahub/basedosdados.rs
//! Base dos Dados public-dataset search via the CKAN package API.

use async_trait::async_trait;
use serde::Deserialize;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

const BASE_URL: &str = "https://basedosdados.org";
const PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
struct CkanResponse {
    #[serde(default)]
    result: CkanResult,
}

#[derive(Debug, Default, Deserialize)]
struct CkanResult {
    #[serde(default)]
    results: Vec<CkanPackage>,
}

#[derive(Debug, Deserialize)]
struct CkanPackage {
    id: Option<String>,
    title: Option<String>,
    name: Option<String>,
    notes: Option<String>,
    description: Option<String>,
    #[serde(alias = "metadata_created")]
    metadata_modified: Option<String>,
    url: Option<String>,
    #[serde(default)]
    resources: Vec<CkanResource>,
}

#[derive(Debug, Deserialize)]
struct CkanResource {
    url: Option<String>,
}

pub struct BaseDosDadosSource {
    http: reqwest::Client,
}

impl BaseDosDadosSource {
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

impl Default for BaseDosDadosSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for BaseDosDadosSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        let endpoint = format!("{BASE_URL}/api/3/action/package_search");
        tracing::debug!(%endpoint, query, "datahub: querying base dos dados");

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&endpoint)
            .query(&[("q", query), ("rows", page_size.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let payload: CkanResponse = response
            .json()
            .await
            .map_err(|e| SourceFetchError::Malformed(e.to_string()))?;

        let docs = payload
            .result
            .results
            .into_iter()
            .filter_map(|pkg| {
                let id = pkg.id.clone().unwrap_or_default();
                if id.is_empty() {
                    return None;
                }
                let resource_url = pkg.resources.first().and_then(|r| r.url.clone());
                Some(SourceDocument {
                    id,
                    title: pkg
                        .title
                        .clone()
                        .or_else(|| pkg.name.clone())
                        .unwrap_or_else(|| "Dataset público".to_string()),
                    summary: pkg
                        .notes
                        .clone()
                        .or_else(|| pkg.description.clone())
                        .unwrap_or_default(),
                    year: pkg.metadata_modified.clone(),
                    source: SourceName::BaseDosDados,
                    link: pkg
                        .url
                        .clone()
                        .or(resource_url)
                        .unwrap_or_else(|| format!("{BASE_URL}/")),
                })
            })
            .collect();
        Ok(docs)
    }

    fn name(&self) -> &'static str {
        "basedosdados"
    }
}

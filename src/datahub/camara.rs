// src/datahub/camara.rs
//! Câmara dos Deputados open-data fetcher (proposições endpoint).

use async_trait::async_trait;
use serde::Deserialize;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

const DEFAULT_BASE_URL: &str = "https://dadosabertos.camara.leg.br/api/v2";
const PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
struct CamaraResponse {
    #[serde(default)]
    dados: Vec<CamaraItem>,
}

#[derive(Debug, Deserialize)]
struct CamaraItem {
    id: Option<i64>,
    ementa: Option<String>,
    #[serde(rename = "siglaTipo")]
    sigla_tipo: Option<String>,
    ano: Option<i32>,
    uri: Option<String>,
}

pub struct CamaraSource {
    http: reqwest::Client,
    base_url: String,
}

impl CamaraSource {
    pub fn new(base_url: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DataSource for CamaraSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        let endpoint = format!("{}/proposicoes", self.base_url);
        tracing::debug!(%endpoint, query, "datahub: querying camara");

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("keywords", query),
                ("itens", page_size.as_str()),
                ("ordem", "DESC"),
                ("ordenarPor", "id"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: CamaraResponse = response
            .json()
            .await
            .map_err(|e| SourceFetchError::Malformed(e.to_string()))?;

        let docs = payload
            .dados
            .into_iter()
            .filter_map(|item| {
                let id = item.id?;
                let ementa = item.ementa.unwrap_or_default();
                Some(SourceDocument {
                    id: id.to_string(),
                    title: if ementa.is_empty() {
                        item.sigla_tipo.unwrap_or_else(|| "Proposição".to_string())
                    } else {
                        ementa.clone()
                    },
                    summary: ementa,
                    year: item.ano.map(|a| a.to_string()),
                    source: SourceName::Camara,
                    link: item.uri.unwrap_or_default(),
                })
            })
            .collect();
        Ok(docs)
    }

    fn name(&self) -> &'static str {
        "camara"
    }
}

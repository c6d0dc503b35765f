// src/datahub/senado.rs
//! Senado Federal open-data fetcher (matéria search). The payload nests
//! `Materias.Materia` as either an object or a list and moves identifiers
//! between levels, so extraction walks a `serde_json::Value` instead of a
//! fixed struct.

use async_trait::async_trait;
use serde_json::Value;

use super::types::{DataSource, SourceDocument, SourceName};
use crate::error::SourceFetchError;

const DEFAULT_BASE_URL: &str = "https://legis.senado.leg.br/dadosabertos";
const PAGE_SIZE: u32 = 5;

pub struct SenadoSource {
    http: reqwest::Client,
    base_url: String,
}

impl SenadoSource {
    pub fn new(base_url: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("elo-assistant/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(12))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        }
    }
}

fn extract_materias(payload: &Value) -> Vec<Value> {
    let root = payload
        .get("PesquisaMateria")
        .or_else(|| payload.get("pesquisaMateria"))
        .cloned()
        .unwrap_or(Value::Null);
    let materias = root
        .pointer("/Materias/Materia")
        .or_else(|| root.get("Materia"))
        .or_else(|| root.get("materia"))
        .cloned()
        .unwrap_or(Value::Null);
    match materias {
        Value::Array(items) => items,
        Value::Object(_) => vec![materias],
        _ => Vec::new(),
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn to_document(materia: &Value) -> Option<SourceDocument> {
    let identificacao = materia
        .get("IdentificacaoMateria")
        .cloned()
        .unwrap_or(Value::Null);

    let codigo = str_field(materia, "CodigoMateria")
        .or_else(|| str_field(&identificacao, "CodigoMateria"))
        .or_else(|| str_field(&identificacao, "NumeroMateria"))
        .or_else(|| str_field(materia, "id"))
        .or_else(|| str_field(materia, "idMateria"))?;

    let ementa = str_field(materia, "EmentaMateria")
        .or_else(|| str_field(materia, "ExplicacaoEmentaMateria"))
        .unwrap_or_default();

    Some(SourceDocument {
        id: codigo,
        title: if ementa.is_empty() {
            str_field(&identificacao, "DescricaoIdentificacaoMateria")
                .unwrap_or_else(|| "Matéria do Senado".to_string())
        } else {
            ementa.clone()
        },
        summary: ementa,
        year: str_field(materia, "AnoMateria")
            .or_else(|| str_field(&identificacao, "AnoMateria"))
            .or_else(|| str_field(materia, "DataApresentacao")),
        source: SourceName::Senado,
        link: str_field(materia, "UrlTextoOriginal")
            .or_else(|| str_field(materia, "LinkInteiroTeor"))
            .or_else(|| str_field(materia, "Link"))
            .or_else(|| str_field(&identificacao, "UrlTextoOriginal"))
            .unwrap_or_default(),
    })
}

#[async_trait]
impl DataSource for SenadoSource {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        let endpoint = format!("{}/materia/pesquisa/lista", self.base_url);
        tracing::debug!(%endpoint, query, "datahub: querying senado");

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&endpoint)
            .header("Accept", "application/json")
            .query(&[
                ("PalavraChave", query),
                ("Pagina", "1"),
                ("Itens", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SourceFetchError::Malformed(e.to_string()))?;

        Ok(extract_materias(&payload)
            .iter()
            .filter_map(to_document)
            .collect())
    }

    fn name(&self) -> &'static str {
        "senado"
    }
}

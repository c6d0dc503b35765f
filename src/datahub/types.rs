// src/datahub/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceFetchError;

/// Which provider produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    Camara,
    Senado,
    #[serde(rename = "qd")]
    QueridoDiario,
    BaseDosDados,
    Tse,
    Datajud,
    Mock,
}

impl SourceName {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceName::Camara => "camara",
            SourceName::Senado => "senado",
            SourceName::QueridoDiario => "qd",
            SourceName::BaseDosDados => "basedosdados",
            SourceName::Tse => "tse",
            SourceName::Datajud => "datajud",
            SourceName::Mock => "mock",
        }
    }
}

impl std::fmt::Display for SourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized result. Field names are canonical regardless of what the
/// source called them; prompt building depends on this schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Source-local identifier; dedup key. Same id from two sources means
    /// the same document — first seen wins.
    pub id: String,
    pub title: String,
    pub summary: String,
    pub year: Option<String>,
    pub source: SourceName,
    pub link: String,
}

/// One independent data-source fetcher. Implementations report failures as
/// `Err`; the aggregator wraps every call in failure isolation so no source
/// can block or abort its siblings.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Vec<SourceDocument>, SourceFetchError>;
    fn name(&self) -> &'static str;
}

/// Source-set selector for a federated search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSet {
    /// Câmara + Senado only.
    Legislative,
    /// Every configured source.
    All,
}

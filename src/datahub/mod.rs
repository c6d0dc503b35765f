// src/datahub/mod.rs
//! Federated public-data hub: fans out one query to independent sources,
//! isolates per-source failure, merges and deduplicates the results.

pub mod basedosdados;
pub mod camara;
pub mod datajud;
pub mod mock;
pub mod queridodiario;
pub mod senado;
pub mod tse;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::config::Settings;
use crate::error::SourceFetchError;
use types::{DataSource, SourceDocument, SourceSet};

const UNTITLED: &str = "Sem título";

pub struct DataHub {
    /// Scheduled order: legislative pair first, then the extended sources.
    legislative: Vec<Arc<dyn DataSource>>,
    extended: Vec<Arc<dyn DataSource>>,
    source_timeout: Duration,
}

impl DataHub {
    pub fn new(settings: &Settings) -> Self {
        let legislative: Vec<Arc<dyn DataSource>> = vec![
            Arc::new(camara::CamaraSource::new(settings.api_camara_base_url.as_deref())),
            Arc::new(senado::SenadoSource::new(settings.api_senado_base_url.as_deref())),
        ];
        let extended: Vec<Arc<dyn DataSource>> = vec![
            Arc::new(queridodiario::QueridoDiarioSource::new()),
            Arc::new(basedosdados::BaseDosDadosSource::new()),
            Arc::new(tse::TseSource),
            Arc::new(datajud::DatajudSource),
        ];
        Self {
            legislative,
            extended,
            source_timeout: settings.source_timeout,
        }
    }

    /// Test/bespoke wiring with explicit fetcher handles.
    pub fn from_sources(
        legislative: Vec<Arc<dyn DataSource>>,
        extended: Vec<Arc<dyn DataSource>>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            legislative,
            extended,
            source_timeout,
        }
    }

    fn selected(&self, set: SourceSet) -> Vec<Arc<dyn DataSource>> {
        match set {
            SourceSet::Legislative => self.legislative.clone(),
            SourceSet::All => self
                .legislative
                .iter()
                .chain(self.extended.iter())
                .cloned()
                .collect(),
        }
    }

    /// Queries every selected source concurrently, waits for all of them
    /// (or their individual timeouts) and merges. Never fails: a broken
    /// source degrades to an empty contribution, worst case the whole
    /// result is an empty list.
    pub async fn aggregate(&self, query: &str, set: SourceSet) -> Vec<SourceDocument> {
        let sources = self.selected(set);
        let started = std::time::Instant::now();
        tracing::info!(query, sources = sources.len(), "datahub: federated search");

        let mut handles = Vec::with_capacity(sources.len());
        for source in sources {
            let name = source.name();
            let budget = self.source_timeout;
            let q = query.to_string();
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(budget, source.fetch(&q)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceFetchError::Timeout(budget)),
                }
            });
            handles.push((name, handle));
        }

        // Await all; merge in scheduled source order, arrival order within
        // a source. No early return on first success.
        let mut merged: Vec<SourceDocument> = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(docs)) => {
                    counter!("datahub_documents_total").increment(docs.len() as u64);
                    merged.extend(docs);
                }
                Ok(Err(e)) => {
                    counter!("datahub_source_errors_total").increment(1);
                    tracing::warn!(source = name, error = %e, "datahub: source failed");
                }
                Err(e) => {
                    counter!("datahub_source_errors_total").increment(1);
                    tracing::warn!(source = name, error = %e, "datahub: source task aborted");
                }
            }
        }

        let unique = dedup_and_normalize(merged);
        tracing::info!(
            query,
            documents = unique.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "datahub: federated search done"
        );
        unique
    }
}

/// Dedup by id (first seen wins), drop id-less entries, backfill empty
/// titles so prompt building never renders a blank line.
fn dedup_and_normalize(docs: Vec<SourceDocument>) -> Vec<SourceDocument> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(docs.len());
    for mut doc in docs {
        if doc.id.is_empty() || !seen.insert(doc.id.clone()) {
            continue;
        }
        if doc.title.is_empty() {
            doc.title = UNTITLED.to_string();
        }
        unique.push(doc);
    }
    unique
}

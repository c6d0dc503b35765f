// src/error.rs
//! Typed failure taxonomy. Retry and fallback decisions are driven by these
//! variants as data, never by unwinding.

use std::time::Duration;

use thiserror::Error;

/// A single data-source fetch failed or timed out. Always recovered locally
/// by the aggregator (empty result for that source) and logged.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unparseable response: {0}")]
    Malformed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure calling an external provider (chat model, speech synthesis or
/// messaging channel).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Required credentials/endpoint missing. Never retried.
    #[error("missing configuration: {0}")]
    Config(&'static str),
    /// 401/403-class rejection. Terminal for the provider, never retried.
    #[error("authorization rejected (status {0})")]
    Auth(u16),
    /// Transient call failure, eligible for retry.
    #[error("call failed: {0}")]
    Call(String),
    /// Provider answered with content we could not parse.
    #[error("unparseable response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Only plain call failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Call(_))
    }

    /// Maps a non-success HTTP status; 401/403 become the terminal auth
    /// variant.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ProviderError::Auth(status),
            other => ProviderError::Call(format!("http status {other}")),
        }
    }
}

/// Raised by the delivery engine once every configured provider path is
/// exhausted. The webhook layer converts this into a non-fatal
/// `delivered: false` response body.
#[derive(Debug, Error)]
#[error("delivery failed via {provider}: {source}")]
pub struct DeliveryFailure {
    pub provider: &'static str,
    #[source]
    pub source: ProviderError,
}

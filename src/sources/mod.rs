//! Source adapters for external bibliographic services.
//!
//! Each searchable source implements [`SourceAdapter`]: it translates a
//! query and [`SearchFilters`] into one HTTP request and returns the
//! vendor's response as a typed [`RawPayload`]. Adapters never normalize;
//! that is [`crate::normalize`]'s job.
//!
//! | Adapter | Source name | Endpoint |
//! |---------|-------------|----------|
//! | [`OpenAlexAdapter`] | `openalex` | `GET {base}/works` (JSON) |
//! | [`ArxivAdapter`] | `arxiv` | `GET {base}` (Atom XML) |
//!
//! [`CrossrefResolver`] is not a search adapter; it resolves one DOI.
//!
//! # Error Mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Transport failure or per-request timeout | [`SourceError::Unavailable`] |
//! | HTTP 5xx | [`SourceError::Unavailable`] |
//! | HTTP 4xx | [`SourceError::Rejected`] (with body) |
//! | Undecodable body | [`SourceError::Unavailable`] |

pub mod arxiv;
pub mod crossref;
pub mod openalex;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::SourceError;
use crate::models::{Paper, SearchFilters};
use crate::normalize::{normalize_arxiv, normalize_openalex};
use crate::vendor::{ArxivFeed, OpenAlexResponse};

pub use arxiv::ArxivAdapter;
pub use crossref::CrossrefResolver;
pub use openalex::OpenAlexAdapter;

/// A searchable bibliographic source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable name used as the key in a [`QueryBundle`](crate::aggregate::QueryBundle).
    fn name(&self) -> &str;

    /// Run one search. `limit` is the caller's requested page size; each
    /// adapter caps it to what its vendor accepts.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: u32,
    ) -> Result<RawPayload, SourceError>;
}

/// An unnormalized vendor response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum RawPayload {
    OpenAlex(OpenAlexResponse),
    Arxiv(ArxivFeed),
}

impl RawPayload {
    /// Number of vendor records in the payload.
    pub fn len(&self) -> usize {
        match self {
            RawPayload::OpenAlex(r) => r.results.len(),
            RawPayload::Arxiv(f) => f.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize every record, in vendor order.
    pub fn papers(&self) -> Vec<Paper> {
        match self {
            RawPayload::OpenAlex(r) => r.results.iter().map(normalize_openalex).collect(),
            RawPayload::Arxiv(f) => f.entries.iter().map(normalize_arxiv).collect(),
        }
    }

    /// Canonical ids of every record, in vendor order.
    pub fn ids(&self) -> Vec<String> {
        self.papers().into_iter().map(|p| p.id).collect()
    }
}

/// Build the shared HTTP client for one source.
pub(crate) fn http_client(
    source_name: &str,
    user_agent: &str,
    timeout_secs: u64,
) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SourceError::unavailable(source_name, e.to_string()))
}

/// Send a request and return the body of a 2xx response.
pub(crate) async fn fetch_text(
    source_name: &str,
    request: reqwest::RequestBuilder,
) -> Result<String, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::unavailable(source_name, e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SourceError::unavailable(source_name, e.to_string()))?;

    if status.is_client_error() {
        return Err(SourceError::Rejected {
            source_name: source_name.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    if !status.is_success() {
        return Err(SourceError::unavailable(
            source_name,
            format!("HTTP {}", status),
        ));
    }

    Ok(body)
}

/// Parse a JSON body, mapping decode failures to `Unavailable`.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    source_name: &str,
    body: &str,
) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::unavailable(source_name, format!("invalid JSON: {}", e)))
}

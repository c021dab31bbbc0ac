//! Crossref DOI resolution.

use super::{decode_json, fetch_text, http_client};
use crate::config::CrossrefConfig;
use crate::error::SourceError;
use crate::vendor::{CrossrefEnvelope, CrossrefWork};

pub const SOURCE_NAME: &str = "crossref";

pub struct CrossrefResolver {
    client: reqwest::Client,
    base_url: String,
}

impl CrossrefResolver {
    pub fn new(config: &CrossrefConfig, user_agent: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(SOURCE_NAME, user_agent, config.per_request_timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch `GET {base}/works/{doi}`. The DOI is sent as one
    /// percent-encoded path segment.
    pub async fn resolve(&self, doi: &str) -> Result<CrossrefWork, SourceError> {
        let doi = strip_doi_prefix(doi);
        let mut url = reqwest::Url::parse(&format!("{}/works", self.base_url))
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::unavailable(SOURCE_NAME, "base_url cannot hold a path"))?
            .push(doi);

        let body = fetch_text(SOURCE_NAME, self.client.get(url)).await?;
        let envelope: CrossrefEnvelope = decode_json(SOURCE_NAME, &body)?;
        envelope
            .message
            .ok_or_else(|| SourceError::unavailable(SOURCE_NAME, "response has no message"))
    }
}

/// Accept `10.x/y`, `doi:10.x/y`, and `https://doi.org/10.x/y`.
pub fn strip_doi_prefix(doi: &str) -> &str {
    let doi = doi.trim();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "doi:"] {
        if let Some(rest) = doi.strip_prefix(prefix) {
            return rest;
        }
    }
    doi
}

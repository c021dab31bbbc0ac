//! OpenAlex works search.
//!
//! Sends `GET {base_url}/works` and parses the JSON page into
//! [`OpenAlexResponse`]. Filters map onto the OpenAlex `filter` parameter:
//!
//! | Filter | Clause |
//! |--------|--------|
//! | `year_min = Y` | `from_publication_date:Y-01-01` |
//! | `year_max = Y` | `to_publication_date:Y-12-31` |
//! | `open_access = b` | `is_oa:b` |

use async_trait::async_trait;

use super::{decode_json, fetch_text, http_client, RawPayload, SourceAdapter};
use crate::config::OpenAlexConfig;
use crate::error::SourceError;
use crate::models::SearchFilters;
use crate::vendor::OpenAlexResponse;

pub const SOURCE_NAME: &str = "openalex";

/// OpenAlex rejects pages larger than this.
pub const MAX_PER_PAGE: u32 = 200;

pub struct OpenAlexAdapter {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    api_key: Option<String>,
}

impl OpenAlexAdapter {
    pub fn new(config: &OpenAlexConfig, user_agent: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(SOURCE_NAME, user_agent, config.per_request_timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn query_params(&self, query: &str, filters: &SearchFilters, limit: u32) -> Vec<(String, String)> {
        let mut params = build_query_params(query, filters, limit);
        if let Some(mailto) = &self.mailto {
            params.push(("mailto".to_string(), mailto.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }
        params
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: u32,
    ) -> Result<RawPayload, SourceError> {
        let request = self
            .client
            .get(format!("{}/works", self.base_url))
            .query(&self.query_params(query, filters, limit));

        let body = fetch_text(SOURCE_NAME, request).await?;
        let response: OpenAlexResponse = decode_json(SOURCE_NAME, &body)?;
        Ok(RawPayload::OpenAlex(response))
    }
}

/// Query parameters for a works search, excluding credentials.
pub fn build_query_params(
    query: &str,
    filters: &SearchFilters,
    limit: u32,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("search".to_string(), query.to_string()),
        ("per_page".to_string(), limit.min(MAX_PER_PAGE).to_string()),
        ("sort".to_string(), "relevance_score:desc".to_string()),
    ];
    if let Some(filter) = filter_expression(filters) {
        params.push(("filter".to_string(), filter));
    }
    params
}

/// The comma-joined `filter` value, or `None` when no clause applies.
pub fn filter_expression(filters: &SearchFilters) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(y) = filters.year_min {
        clauses.push(format!("from_publication_date:{}-01-01", y));
    }
    if let Some(y) = filters.year_max {
        clauses.push(format!("to_publication_date:{}-12-31", y));
    }
    if let Some(oa) = filters.open_access {
        clauses.push(format!("is_oa:{}", oa));
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(","))
    }
}

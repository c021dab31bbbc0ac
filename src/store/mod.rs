//! Persistence for papers, embeddings, and the search log.
//!
//! [`PaperStore`] is the async interface the application operations use.
//! Two implementations exist:
//!
//! - [`SqliteStore`]: the on-disk store behind the CLI and HTTP server.
//! - [`InMemoryStore`]: a map-backed store for tests and ephemeral use.
//!
//! # Upsert Semantics
//!
//! Papers are keyed by `id`. An upsert overwrites the normalized fields of
//! an existing row but never its `summary`, and never touches its
//! embeddings. Embeddings are append-only; a paper may carry vectors from
//! several models.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::QueryBundle;
use crate::error::RequestError;
use crate::models::{Embedding, Paper, SearchFilters};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Insert or update by `id`. Fails on an empty id.
    async fn upsert_paper(&self, paper: &Paper) -> Result<()>;

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>>;

    /// Most recently updated first.
    async fn list_papers(&self, limit: usize) -> Result<Vec<Paper>>;

    /// Replace the summary of an existing paper. Returns `false` when no
    /// paper has this id.
    async fn set_summary(&self, id: &str, summary: &str) -> Result<bool>;

    /// Append a vector. Fails when the paper does not exist.
    async fn add_embedding(&self, embedding: &Embedding) -> Result<()>;

    /// Every stored vector with its owning paper, oldest first.
    async fn all_embeddings(&self) -> Result<Vec<(Paper, Embedding)>>;

    async fn record_snapshot(&self, snapshot: &SnapshotRecord) -> Result<()>;

    /// Newest first.
    async fn list_snapshots(&self, limit: usize) -> Result<Vec<SnapshotSummary>>;

    async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>>;
}

/// One logged aggregated search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub id: String,
    pub query: String,
    pub filters: SearchFilters,
    /// Result ids per successful source.
    pub result_ids: BTreeMap<String, Vec<String>>,
    /// The full bundle as returned to the caller.
    pub raw: serde_json::Value,
    pub created_at: i64,
}

impl SnapshotRecord {
    pub fn from_bundle(query: &str, filters: &SearchFilters, bundle: &QueryBundle) -> Result<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            filters: filters.clone(),
            result_ids: bundle.result_ids(),
            raw: serde_json::to_value(bundle)?,
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id.clone(),
            query: self.query.clone(),
            result_count: self.result_ids.values().map(Vec::len).sum(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: String,
    pub query: String,
    pub result_count: usize,
    pub created_at: i64,
}

pub(crate) fn ensure_id(paper: &Paper) -> Result<()> {
    if paper.id.trim().is_empty() {
        return Err(RequestError::bad_input("paper id must not be empty").into());
    }
    Ok(())
}

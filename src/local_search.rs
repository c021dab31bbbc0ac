//! Semantic search over locally stored papers.
//!
//! A full scan: every stored vector of the provider's model is scored
//! against the query embedding.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::RequestError;
use crate::rank::{rank, select_model, ScoredPaper};
use crate::store::{PaperStore, SqliteStore};

pub async fn local_search(
    store: &dyn PaperStore,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Result<Vec<ScoredPaper>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RequestError::bad_input("query must not be empty").into());
    }

    let query_vector = provider.embed(query).await?;
    let candidates = select_model(store.all_embeddings().await?, provider.model_name());
    Ok(rank(&query_vector, candidates, limit))
}

pub async fn run_local_search(config: &Config, query: &str, limit: Option<u32>) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Local search requires embeddings. Set [embedding] provider in config.");
    }

    let limit = limit.unwrap_or(config.retrieval.local_limit);
    if limit == 0 || limit > config.retrieval.max_local_limit {
        bail!(
            "limit must be between 1 and {}",
            config.retrieval.max_local_limit
        );
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let store = SqliteStore::open(&config.db).await?;
    let results = local_search(&store, provider.as_ref(), query, limit as usize).await?;

    if results.is_empty() {
        println!("No results.");
    }
    for (i, scored) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, scored.score, scored.paper.title);
        println!("    id: {}", scored.paper.id);
    }

    store.pool().close().await;
    Ok(())
}

//! Aggregated search: the query path behind `orbit search`, `orbit graph`,
//! and the `/api/search` and `/api/graph` endpoints.
//!
//! Every aggregated search is logged as a snapshot (query, filters, result
//! ids per source, and the raw bundle). A failure to write the snapshot is
//! logged and does not fail the search.

use anyhow::Result;

use crate::aggregate::{Aggregator, QueryBundle, SourceOutcome};
use crate::config::Config;
use crate::error::RequestError;
use crate::graph::{build_graph, CitationGraph};
use crate::models::{Paper, SearchFilters};
use crate::store::{PaperStore, SnapshotRecord, SqliteStore};

/// Fill in the configured default limit when the caller gave none.
pub fn with_default_limit(mut filters: SearchFilters, config: &Config) -> SearchFilters {
    filters
        .limit
        .get_or_insert(config.retrieval.default_limit);
    filters
}

fn check_request(query: &str, filters: &SearchFilters) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RequestError::bad_input("query must not be empty").into());
    }
    filters.validate()?;
    Ok(())
}

/// Validate, aggregate across all sources, and log a snapshot.
pub async fn search_and_record(
    store: &dyn PaperStore,
    aggregator: &Aggregator,
    query: &str,
    filters: &SearchFilters,
) -> Result<QueryBundle> {
    check_request(query, filters)?;
    let query = query.trim();

    let bundle = aggregator.aggregate(query, filters).await;

    match SnapshotRecord::from_bundle(query, filters, &bundle) {
        Ok(snapshot) => {
            if let Err(e) = store.record_snapshot(&snapshot).await {
                tracing::warn!(error = %e, query, "failed to record search snapshot");
            }
        }
        Err(e) => tracing::warn!(error = %e, query, "failed to serialize search snapshot"),
    }

    Ok(bundle)
}

/// Aggregate and build the citation graph of everything returned.
pub async fn search_graph(
    aggregator: &Aggregator,
    query: &str,
    filters: &SearchFilters,
) -> Result<CitationGraph> {
    check_request(query, filters)?;
    let bundle = aggregator.aggregate(query.trim(), filters).await;
    Ok(build_graph(&bundle.papers()))
}

/// Upsert every paper with a usable id. Returns how many were stored.
pub async fn save_papers(store: &dyn PaperStore, papers: &[Paper]) -> Result<usize> {
    let mut saved = 0;
    for paper in papers {
        if paper.id.trim().is_empty() {
            tracing::warn!(title = %paper.title, "skipping paper without id");
            continue;
        }
        store.upsert_paper(paper).await?;
        saved += 1;
    }
    Ok(saved)
}

pub async fn run_search(
    config: &Config,
    query: &str,
    filters: SearchFilters,
    save: bool,
    json: bool,
) -> Result<()> {
    let filters = with_default_limit(filters, config);
    let store = SqliteStore::open(&config.db).await?;
    let aggregator = Aggregator::from_config(config)?;

    let bundle = search_and_record(&store, &aggregator, query, &filters).await?;
    let papers = bundle.papers();

    if save {
        let saved = save_papers(&store, &papers).await?;
        eprintln!("Saved {} papers.", saved);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        store.pool().close().await;
        return Ok(());
    }

    for (name, outcome) in &bundle.sources {
        match outcome {
            SourceOutcome::Ok {
                items, elapsed_ms, ..
            } => println!("{:<10} ok      {} items ({} ms)", name, items, elapsed_ms),
            SourceOutcome::Failed {
                reason,
                detail,
                elapsed_ms,
            } => println!(
                "{:<10} failed  {:?} after {} ms: {}",
                name, reason, elapsed_ms, detail
            ),
        }
    }
    println!();

    if papers.is_empty() {
        println!("No results.");
    }

    for (i, paper) in papers.iter().enumerate() {
        let year = paper.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        let title = if paper.title.is_empty() {
            "(untitled)"
        } else {
            paper.title.as_str()
        };
        println!("{}. [{}] {}{}", i + 1, paper.source.as_str(), title, year);
        if !paper.authors.is_empty() {
            let names: Vec<&str> = paper.authors.iter().map(|a| a.name.as_str()).collect();
            println!("    authors: {}", names.join(", "));
        }
        if let Some(ref doi) = paper.doi {
            println!("    doi: {}", doi);
        }
        if let Some(ref url) = paper.url {
            println!("    url: {}", url);
        }
        println!("    id: {}", paper.id);
        println!();
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_graph(config: &Config, query: &str, filters: SearchFilters, json: bool) -> Result<()> {
    let filters = with_default_limit(filters, config);
    let aggregator = Aggregator::from_config(config)?;
    let graph = search_graph(&aggregator, query, &filters).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    let stubs = graph.nodes.iter().filter(|n| n.stub).count();
    println!(
        "{} nodes ({} papers, {} unresolved references), {} edges",
        graph.nodes.len(),
        graph.nodes.len() - stubs,
        stubs,
        graph.edges.len()
    );
    for node in graph.nodes.iter().filter(|n| !n.stub) {
        let out_degree = graph.edges.iter().filter(|e| e.source == node.id).count();
        println!("  {}  cites {}  {}", node.label, out_degree, node.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::sources::{RawPayload, SourceAdapter};
    use crate::store::InMemoryStore;
    use crate::vendor::{OpenAlexResponse, OpenAlexWork};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct OneWork;

    #[async_trait]
    impl SourceAdapter for OneWork {
        fn name(&self) -> &str {
            "openalex"
        }
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _limit: u32,
        ) -> Result<RawPayload, SourceError> {
            Ok(RawPayload::OpenAlex(OpenAlexResponse {
                meta: None,
                results: vec![OpenAlexWork {
                    id: Some("https://openalex.org/W1".to_string()),
                    title: Some("One".to_string()),
                    referenced_works: vec!["https://openalex.org/W2".to_string()],
                    ..Default::default()
                }],
            }))
        }
    }

    fn aggregator() -> Aggregator {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(OneWork)];
        Aggregator::new(adapters, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_search_records_snapshot() {
        let store = InMemoryStore::new();
        let bundle = search_and_record(&store, &aggregator(), "  graphs ", &SearchFilters::default())
            .await
            .unwrap();
        assert!(bundle.get("openalex").unwrap().is_ok());

        let snapshots = store.list_snapshots(10).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].query, "graphs");
        assert_eq!(snapshots[0].result_count, 1);

        let full = store.get_snapshot(&snapshots[0].id).await.unwrap().unwrap();
        assert_eq!(full.result_ids["openalex"], vec!["https://openalex.org/W1"]);
        assert_eq!(full.raw["openalex"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_aggregation() {
        let store = InMemoryStore::new();
        let bad = SearchFilters {
            year_min: Some(2024),
            year_max: Some(2000),
            ..Default::default()
        };
        assert!(search_and_record(&store, &aggregator(), "q", &bad).await.is_err());
        assert!(search_and_record(&store, &aggregator(), "   ", &SearchFilters::default())
            .await
            .is_err());
        assert!(store.list_snapshots(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_graph_from_search() {
        let graph = search_graph(&aggregator(), "q", &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.node("https://openalex.org/W2").unwrap().stub);
    }

    #[test]
    fn test_default_limit_only_fills_missing() {
        let config = Config::default();
        assert_eq!(with_default_limit(SearchFilters::default(), &config).limit, Some(20));
        let explicit = SearchFilters {
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(with_default_limit(explicit, &config).limit, Some(5));
    }

    #[tokio::test]
    async fn test_save_skips_empty_ids() {
        let store = InMemoryStore::new();
        let papers = vec![
            Paper::new("", crate::models::PaperSource::Manual, "no id"),
            Paper::new("x", crate::models::PaperSource::Manual, "has id"),
        ];
        assert_eq!(save_papers(&store, &papers).await.unwrap(), 1);
    }
}

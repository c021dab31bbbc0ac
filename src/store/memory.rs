use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ensure_id, PaperStore, SnapshotRecord, SnapshotSummary};
use crate::error::RequestError;
use crate::models::{Embedding, Paper};

#[derive(Default)]
struct Inner {
    papers: HashMap<String, (Paper, u64)>,
    embeddings: Vec<Embedding>,
    snapshots: Vec<SnapshotRecord>,
    clock: u64,
}

/// Map-backed [`PaperStore`]. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaperStore for InMemoryStore {
    async fn upsert_paper(&self, paper: &Paper) -> Result<()> {
        ensure_id(paper)?;
        let mut inner = self.inner.write().await;
        inner.clock += 1;
        let now = inner.clock;

        let mut stored = paper.clone();
        if let Some((existing, _)) = inner.papers.get(&paper.id) {
            stored.summary = existing.summary.clone();
        }
        inner.papers.insert(paper.id.clone(), (stored, now));
        Ok(())
    }

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>> {
        let inner = self.inner.read().await;
        Ok(inner.papers.get(id).map(|(p, _)| p.clone()))
    }

    async fn list_papers(&self, limit: usize) -> Result<Vec<Paper>> {
        let inner = self.inner.read().await;
        let mut papers: Vec<&(Paper, u64)> = inner.papers.values().collect();
        papers.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(papers.into_iter().take(limit).map(|(p, _)| p.clone()).collect())
    }

    async fn set_summary(&self, id: &str, summary: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.clock += 1;
        let now = inner.clock;
        match inner.papers.get_mut(id) {
            Some((paper, updated)) => {
                paper.summary = Some(summary.to_string());
                *updated = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_embedding(&self, embedding: &Embedding) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.papers.contains_key(&embedding.paper_id) {
            return Err(RequestError::paper_not_found(&embedding.paper_id).into());
        }
        inner.embeddings.push(embedding.clone());
        Ok(())
    }

    async fn all_embeddings(&self) -> Result<Vec<(Paper, Embedding)>> {
        let inner = self.inner.read().await;
        Ok(inner
            .embeddings
            .iter()
            .filter_map(|e| {
                inner
                    .papers
                    .get(&e.paper_id)
                    .map(|(p, _)| (p.clone(), e.clone()))
            })
            .collect())
    }

    async fn record_snapshot(&self, snapshot: &SnapshotRecord) -> Result<()> {
        self.inner.write().await.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn list_snapshots(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .iter()
            .rev()
            .take(limit)
            .map(SnapshotRecord::summary)
            .collect())
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.snapshots.iter().find(|s| s.id == id).cloned())
    }
}

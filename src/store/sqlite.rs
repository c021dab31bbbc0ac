use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{ensure_id, PaperStore, SnapshotRecord, SnapshotSummary};
use crate::config::DbConfig;
use crate::db;
use crate::error::RequestError;
use crate::migrate;
use crate::models::{Embedding, Paper, PaperSource};

const PAPER_COLUMNS: &str = "p.id, p.source, p.title, p.abstract, p.doi, p.source_specific_id, \
     p.year, p.venue, p.url, p.pdf_url, p.topics_json, p.authors_json, p.references_json, p.summary";

/// SQLite-backed [`PaperStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database and make sure the schema exists.
    pub async fn open(config: &DbConfig) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn paper_from_row(row: &SqliteRow) -> Result<Paper> {
    let source: String = row.try_get("source")?;
    let topics_json: String = row.try_get("topics_json")?;
    let authors_json: String = row.try_get("authors_json")?;
    let references_json: String = row.try_get("references_json")?;

    let mut paper = Paper::new(
        row.try_get::<String, _>("id")?,
        PaperSource::parse(&source).unwrap_or_default(),
        row.try_get::<String, _>("title")?,
    );
    paper.abstract_text = row.try_get("abstract")?;
    paper.doi = row.try_get("doi")?;
    paper.source_specific_id = row.try_get("source_specific_id")?;
    paper.year = row.try_get("year")?;
    paper.venue = row.try_get("venue")?;
    paper.url = row.try_get("url")?;
    paper.pdf_url = row.try_get("pdf_url")?;
    paper.topics = serde_json::from_str(&topics_json).context("corrupt topics_json")?;
    paper.authors = serde_json::from_str(&authors_json).context("corrupt authors_json")?;
    paper.references =
        serde_json::from_str(&references_json).context("corrupt references_json")?;
    paper.summary = row.try_get("summary")?;
    Ok(paper)
}

fn snapshot_from_row(row: &SqliteRow) -> Result<SnapshotRecord> {
    let filters_json: String = row.try_get("filters_json")?;
    let result_ids_json: String = row.try_get("result_ids_json")?;
    let raw_json: String = row.try_get("raw_json")?;
    Ok(SnapshotRecord {
        id: row.try_get("id")?,
        query: row.try_get("query")?,
        filters: serde_json::from_str(&filters_json).context("corrupt filters_json")?,
        result_ids: serde_json::from_str(&result_ids_json).context("corrupt result_ids_json")?,
        raw: serde_json::from_str(&raw_json).context("corrupt raw_json")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl PaperStore for SqliteStore {
    async fn upsert_paper(&self, paper: &Paper) -> Result<()> {
        ensure_id(paper)?;
        let now = chrono::Utc::now().timestamp();

        // summary is only written for new rows
        sqlx::query(
            r#"
            INSERT INTO papers (id, source, title, abstract, doi, source_specific_id, year, venue,
                                url, pdf_url, topics_json, authors_json, references_json, summary,
                                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source = excluded.source,
                title = excluded.title,
                abstract = excluded.abstract,
                doi = excluded.doi,
                source_specific_id = excluded.source_specific_id,
                year = excluded.year,
                venue = excluded.venue,
                url = excluded.url,
                pdf_url = excluded.pdf_url,
                topics_json = excluded.topics_json,
                authors_json = excluded.authors_json,
                references_json = excluded.references_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&paper.id)
        .bind(paper.source.as_str())
        .bind(&paper.title)
        .bind(&paper.abstract_text)
        .bind(&paper.doi)
        .bind(&paper.source_specific_id)
        .bind(paper.year)
        .bind(&paper.venue)
        .bind(&paper.url)
        .bind(&paper.pdf_url)
        .bind(serde_json::to_string(&paper.topics)?)
        .bind(serde_json::to_string(&paper.authors)?)
        .bind(serde_json::to_string(&paper.references)?)
        .bind(&paper.summary)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert paper {}", paper.id))?;

        Ok(())
    }

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>> {
        let row = sqlx::query(&format!("SELECT {} FROM papers p WHERE p.id = ?", PAPER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(paper_from_row).transpose()
    }

    async fn list_papers(&self, limit: usize) -> Result<Vec<Paper>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM papers p ORDER BY p.updated_at DESC, p.rowid DESC LIMIT ?",
            PAPER_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(paper_from_row).collect()
    }

    async fn set_summary(&self, id: &str, summary: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE papers SET summary = ?, updated_at = ? WHERE id = ?")
            .bind(summary)
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_embedding(&self, embedding: &Embedding) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM papers WHERE id = ?")
            .bind(&embedding.paper_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(RequestError::paper_not_found(&embedding.paper_id).into());
        }

        sqlx::query(
            "INSERT INTO embeddings (id, paper_id, model, dim, vector, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&embedding.paper_id)
        .bind(&embedding.model)
        .bind(embedding.dim as i64)
        .bind(crate::embedding::vec_to_blob(&embedding.vector))
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all_embeddings(&self) -> Result<Vec<(Paper, Embedding)>> {
        let rows = sqlx::query(&format!(
            "SELECT e.model AS e_model, e.dim AS e_dim, e.vector AS e_vector, {} \
             FROM embeddings e JOIN papers p ON p.id = e.paper_id \
             ORDER BY e.created_at ASC, e.rowid ASC",
            PAPER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let paper = paper_from_row(row)?;
            let model: String = row.try_get("e_model")?;
            let dim: i64 = row.try_get("e_dim")?;
            let blob: Vec<u8> = row.try_get("e_vector")?;
            let dim = usize::try_from(dim).unwrap_or(usize::MAX);
            match Embedding::from_blob(paper.id.clone(), model, dim, &blob) {
                Ok(embedding) => out.push((paper, embedding)),
                Err(e) => tracing::warn!(paper_id = %paper.id, error = %e, "skipping stored embedding"),
            }
        }
        Ok(out)
    }

    async fn record_snapshot(&self, snapshot: &SnapshotRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO snapshots (id, query, filters_json, result_ids_json, raw_json, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&snapshot.id)
        .bind(&snapshot.query)
        .bind(serde_json::to_string(&snapshot.filters)?)
        .bind(serde_json::to_string(&snapshot.result_ids)?)
        .bind(serde_json::to_string(&snapshot.raw)?)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_snapshots(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        let rows = sqlx::query(
            "SELECT id, query, filters_json, result_ids_json, raw_json, created_at \
             FROM snapshots ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| snapshot_from_row(row).map(|s| s.summary()))
            .collect()
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>> {
        let row = sqlx::query(
            "SELECT id, query, filters_json, result_ids_json, raw_json, created_at \
             FROM snapshots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(snapshot_from_row).transpose()
    }
}

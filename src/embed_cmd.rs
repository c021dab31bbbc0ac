use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::RequestError;
use crate::models::{Embedding, Paper};
use crate::store::{PaperStore, SqliteStore};

/// Text sent to the embedding service for a paper: title, abstract, and
/// summary, separated by blank lines, cut to `max_chars` characters.
pub fn embedding_text(paper: &Paper, max_chars: usize) -> String {
    let parts: Vec<&str> = [
        Some(paper.title.as_str()),
        paper.abstract_text.as_deref(),
        paper.summary.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect();

    parts.join("\n\n").chars().take(max_chars).collect()
}

/// Embed one stored paper and append the vector.
pub async fn embed_paper(
    store: &dyn PaperStore,
    provider: &dyn EmbeddingProvider,
    paper_id: &str,
    max_chars: usize,
) -> Result<Embedding> {
    let paper = match store.get_paper(paper_id).await? {
        Some(p) => p,
        None => return Err(RequestError::paper_not_found(paper_id).into()),
    };

    let text = embedding_text(&paper, max_chars);
    if text.is_empty() {
        return Err(RequestError::bad_input(format!("paper {} has no text to embed", paper_id)).into());
    }

    let vector = provider.embed(&text).await?;
    let embedding = Embedding::new(paper.id, provider.model_name(), vector);
    store.add_embedding(&embedding).await?;
    Ok(embedding)
}

pub async fn run_embed(config: &Config, paper_id: &str) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let store = SqliteStore::open(&config.db).await?;

    let embedding = embed_paper(
        &store,
        provider.as_ref(),
        paper_id,
        config.embedding.max_input_chars,
    )
    .await?;

    println!("embed");
    println!("  paper: {}", embedding.paper_id);
    println!("  model: {}", embedding.model);
    println!("  dim: {}", embedding.dim);

    store.pool().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::models::PaperSource;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn model_name(&self) -> &str {
            "length-v1"
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[test]
    fn test_embedding_text_joins_and_truncates() {
        let mut paper = Paper::new("p", PaperSource::Manual, "Title");
        paper.abstract_text = Some("  Abstract. ".to_string());
        paper.summary = Some("Summary".to_string());
        assert_eq!(embedding_text(&paper, 1000), "Title\n\nAbstract.\n\nSummary");
        assert_eq!(embedding_text(&paper, 5), "Title");
    }

    #[tokio::test]
    async fn test_embed_paper_appends_vector() {
        let store = InMemoryStore::new();
        store
            .upsert_paper(&Paper::new("p", PaperSource::Manual, "Title"))
            .await
            .unwrap();

        let e = embed_paper(&store, &LengthProvider, "p", 100).await.unwrap();
        assert_eq!(e.model, "length-v1");
        assert_eq!(e.dim, 2);
        assert_eq!(e.vector[0], 5.0);

        embed_paper(&store, &LengthProvider, "p", 100).await.unwrap();
        assert_eq!(store.all_embeddings().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_embed_missing_paper_or_provider_failure() {
        let store = InMemoryStore::new();
        assert!(embed_paper(&store, &LengthProvider, "nope", 100).await.is_err());

        store
            .upsert_paper(&Paper::new("p", PaperSource::Manual, "Title"))
            .await
            .unwrap();
        let err = embed_paper(&store, &embedding::DisabledProvider, "p", 100)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EmbeddingError>(),
            Some(EmbeddingError::Disabled)
        ));
        assert!(store.all_embeddings().await.unwrap().is_empty());
    }
}

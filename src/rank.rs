//! Brute-force cosine ranking of stored papers against a query vector.
//!
//! Scores are computed in `f64` as `dot / (‖a‖·‖b‖ + 1e-12)`. The epsilon
//! keeps a zero vector from dividing by zero; such a vector scores 0.
//!
//! Candidates are expected to share the query's embedding model. Use
//! [`select_model`] first; vectors from different models live in different
//! spaces and their cosine is meaningless.

use serde::Serialize;

use crate::models::{Embedding, Paper};

const NORM_EPSILON: f64 = 1e-12;

/// A paper with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPaper {
    pub paper: Paper,
    pub score: f64,
}

/// Cosine similarity over the first `min(a.len(), b.len())` dimensions.
///
/// Returns `0.0` for empty input and for any non-finite result.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt() + NORM_EPSILON);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Score every candidate against `query`, sort descending, keep `limit`.
///
/// The sort is stable: candidates with equal scores keep their input order.
/// Truncation happens after sorting, so the result is always the true top
/// `limit`.
pub fn rank(query: &[f32], candidates: Vec<(Paper, Embedding)>, limit: usize) -> Vec<ScoredPaper> {
    let mut scored: Vec<ScoredPaper> = candidates
        .into_iter()
        .map(|(paper, embedding)| {
            if embedding.vector.len() != query.len() {
                tracing::warn!(
                    paper_id = %paper.id,
                    model = %embedding.model,
                    expected = query.len(),
                    actual = embedding.vector.len(),
                    "embedding dimension mismatch; scoring over the shared prefix"
                );
            }
            let score = cosine_similarity(query, &embedding.vector);
            ScoredPaper { paper, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

/// Keep only candidates embedded with `model`.
pub fn select_model(candidates: Vec<(Paper, Embedding)>, model: &str) -> Vec<(Paper, Embedding)> {
    candidates
        .into_iter()
        .filter(|(_, e)| e.model == model)
        .collect()
}

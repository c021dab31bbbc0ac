//! Attaching structured summaries to stored papers.
//!
//! Summaries are produced elsewhere (typically by a language model) and
//! arrive as three paragraphs. They are stored as one text block and become
//! part of the paper's embedding text.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::store::PaperStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryInput {
    #[serde(default)]
    pub background_problem: String,
    #[serde(default)]
    pub method_results: String,
    #[serde(default)]
    pub limitations_future: String,
}

impl SummaryInput {
    /// The non-empty paragraphs joined with blank lines.
    pub fn render(&self) -> String {
        [
            &self.background_problem,
            &self.method_results,
            &self.limitations_future,
        ]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

/// Store the rendered summary on an existing paper and return it.
pub async fn attach_summary(store: &dyn PaperStore, id: &str, input: &SummaryInput) -> Result<String> {
    let text = input.render();
    if text.is_empty() {
        return Err(RequestError::bad_input("summary must have at least one non-empty section").into());
    }
    if !store.set_summary(id, &text).await? {
        return Err(RequestError::paper_not_found(id).into());
    }
    Ok(text)
}

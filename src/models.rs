//! Core data models used throughout Paper Orbit.
//!
//! These types represent the canonical papers, search filters, and embedding
//! records that flow between the source adapters, the store, and the ranker.

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, FilterError};

/// Upper bound accepted for [`SearchFilters::limit`].
pub const MAX_FILTER_LIMIT: u32 = 200;
/// Page size used when no limit is supplied.
pub const DEFAULT_FILTER_LIMIT: u32 = 20;

/// Where a canonical paper record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaperSource {
    /// Keyed bibliographic database (OpenAlex).
    #[serde(rename = "openalex")]
    BibliographicDb,
    /// Preprint feed (arXiv).
    #[serde(rename = "arxiv")]
    PreprintFeed,
    /// DOI resolver (Crossref).
    #[serde(rename = "crossref")]
    ReferenceResolver,
    #[default]
    Manual,
}

impl PaperSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::BibliographicDb => "openalex",
            PaperSource::PreprintFeed => "arxiv",
            PaperSource::ReferenceResolver => "crossref",
            PaperSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openalex" => Some(PaperSource::BibliographicDb),
            "arxiv" => Some(PaperSource::PreprintFeed),
            "crossref" => Some(PaperSource::ReferenceResolver),
            "manual" => Some(PaperSource::Manual),
            _ => None,
        }
    }
}

/// A paper author in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// A subject tag attached to a paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Canonical paper record, independent of the originating source.
///
/// `id` is stable for a given vendor record, so re-normalizing the same
/// payload and upserting it never creates a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: String,
    #[serde(default)]
    pub source: PaperSource,
    pub title: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// arXiv identifier or OpenAlex work id, depending on `source`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_specific_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub authors: Vec<Author>,
    /// Outbound reference identifiers, unresolved. Insertion-ordered set.
    #[serde(default)]
    pub references: Vec<String>,
    /// Local-language summary attached after persistence. Never set by
    /// normalization and never overwritten by an upsert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Paper {
    /// An empty record for `id`, with every optional field absent.
    pub fn new(id: impl Into<String>, source: PaperSource, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source,
            title: title.into(),
            abstract_text: None,
            doi: None,
            source_specific_id: None,
            year: None,
            venue: None,
            url: None,
            pdf_url: None,
            topics: Vec::new(),
            authors: Vec::new(),
            references: Vec::new(),
            summary: None,
        }
    }
}

/// Advisory search filters. Adapters translate what they can and silently
/// ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchFilters {
    pub fn validate(&self) -> Result<(), FilterError> {
        if let (Some(min), Some(max)) = (self.year_min, self.year_max) {
            if min > max {
                return Err(FilterError::YearRange { min, max });
            }
        }
        if let Some(limit) = self.limit {
            if !(1..=MAX_FILTER_LIMIT).contains(&limit) {
                return Err(FilterError::Limit(limit));
            }
        }
        Ok(())
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_FILTER_LIMIT)
    }
}

/// A stored embedding vector for one paper.
///
/// `dim` always equals `vector.len()`. Vectors produced by different models
/// must never be compared with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub paper_id: String,
    pub model: String,
    pub dim: usize,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn new(paper_id: impl Into<String>, model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            paper_id: paper_id.into(),
            model: model.into(),
            dim: vector.len(),
            vector,
        }
    }

    /// Rebuild an embedding from its stored BLOB, cross-checking `dim`.
    pub fn from_blob(
        paper_id: impl Into<String>,
        model: impl Into<String>,
        dim: usize,
        blob: &[u8],
    ) -> Result<Self, EmbeddingError> {
        if dim.checked_mul(4) != Some(blob.len()) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                actual: blob.len() / 4,
            });
        }
        Ok(Self::new(paper_id, model, crate::embedding::blob_to_vec(blob)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_reject_inverted_year_range() {
        let f = SearchFilters {
            year_min: Some(2023),
            year_max: Some(2020),
            ..Default::default()
        };
        assert_eq!(
            f.validate(),
            Err(FilterError::YearRange {
                min: 2023,
                max: 2020
            })
        );
    }

    #[test]
    fn test_filters_limit_bounds() {
        let mut f = SearchFilters::default();
        assert_eq!(f.effective_limit(), 20);
        f.limit = Some(0);
        assert!(f.validate().is_err());
        f.limit = Some(201);
        assert!(f.validate().is_err());
        f.limit = Some(200);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_filters_deserialize_camel_case() {
        let f: SearchFilters =
            serde_json::from_str(r#"{"yearMin":2020,"yearMax":2022,"openAccess":true}"#).unwrap();
        assert_eq!(f.year_min, Some(2020));
        assert_eq!(f.year_max, Some(2022));
        assert_eq!(f.open_access, Some(true));
        assert!(serde_json::from_str::<SearchFilters>(r#"{"bogus":1}"#).is_err());
    }

    #[test]
    fn test_paper_source_serializes_as_vendor_name() {
        let json = serde_json::to_string(&PaperSource::PreprintFeed).unwrap();
        assert_eq!(json, "\"arxiv\"");
        assert_eq!(PaperSource::parse("openalex"), Some(PaperSource::BibliographicDb));
        assert_eq!(PaperSource::parse("nope"), None);
    }

    #[test]
    fn test_embedding_from_blob_checks_dim() {
        let blob = crate::embedding::vec_to_blob(&[1.0, 2.0, 3.0]);
        let ok = Embedding::from_blob("p", "m", 3, &blob).unwrap();
        assert_eq!(ok.vector, vec![1.0, 2.0, 3.0]);
        assert_eq!(ok.dim, 3);

        let err = Embedding::from_blob("p", "m", 4, &blob).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_embedding_from_blob_rejects_overflowing_dim() {
        let err = Embedding::from_blob("p", "m", i64::MAX as usize, &[0u8; 8]).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { actual: 2, .. }
        ));
    }
}

//! Error taxonomy for the retrieval core.
//!
//! Source failures never escape the aggregator: they are converted into a
//! [`FailureReason`] and stored alongside the other sources' results.
//! Embedding failures, by contrast, are fatal to the single operation that
//! requested them and propagate to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single bibliographic source call.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Transport failure, per-request timeout, 5xx, or an undecodable body.
    #[error("{source_name} unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },

    /// The vendor answered with a 4xx and an error body.
    #[error("{source_name} rejected the request (HTTP {status}): {body}")]
    Rejected {
        source_name: String,
        status: u16,
        body: String,
    },

    /// The aggregation deadline elapsed before the source answered.
    #[error("{source_name} did not respond within {after_ms} ms")]
    Timeout { source_name: String, after_ms: u64 },
}

impl SourceError {
    pub fn unavailable(source_name: &str, message: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn reason(&self) -> FailureReason {
        match self {
            SourceError::Unavailable { .. } => FailureReason::Unavailable,
            SourceError::Rejected { .. } => FailureReason::Rejected,
            SourceError::Timeout { .. } => FailureReason::Timeout,
        }
    }
}

/// Machine-readable failure marker stored in a [`QueryBundle`](crate::aggregate::QueryBundle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Unavailable,
    Rejected,
    Timeout,
    /// The adapter task panicked or was cancelled before settling.
    Aborted,
}

/// Failure of the embedding service or of stored-vector decoding.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled; set [embedding] provider in config")]
    Disabled,

    #[error("embedding credential missing: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("embedding service returned no vector")]
    EmptyResponse,

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding service error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Invalid [`SearchFilters`](crate::models::SearchFilters) supplied at the edges.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("yearMin ({min}) must not exceed yearMax ({max})")]
    YearRange { min: i32, max: i32 },

    #[error("limit must be between 1 and 200, got {0}")]
    Limit(u32),
}

/// A request the application layer refuses, independent of transport.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    BadInput(String),
}

impl RequestError {
    pub fn paper_not_found(id: impl Into<String>) -> Self {
        RequestError::NotFound {
            kind: "paper",
            id: id.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        RequestError::BadInput(message.into())
    }
}

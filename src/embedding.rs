//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]**: always fails; used when embeddings are not configured.
//! - **[`OpenAIProvider`]**: calls an OpenAI-compatible `POST {base_url}/embeddings`
//!   endpoint with retry and backoff.
//!
//! Also provides the BLOB codec used by the store:
//! - [`vec_to_blob`] encodes a `Vec<f32>` as little-endian bytes
//! - [`blob_to_vec`] decodes it again
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the appropriate provider based
//! on the configuration:
//!
//! ```rust
//! # use paper_orbit::config::EmbeddingConfig;
//! # use paper_orbit::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! A missing credential is a configuration error and is never retried.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

/// A text embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier stored alongside every vector (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI embeddings API or a compatible
/// server.
pub struct OpenAIProvider {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    api_key_env: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl OpenAIProvider {
    /// The credential is not checked here; [`embed`](EmbeddingProvider::embed)
    /// reports it as [`EmbeddingError::MissingCredential`].
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key_env: config.api_key_env.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbeddingError::MissingCredential(self.api_key_env.clone()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
                        return parse_openai_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = EmbeddingError::Api {
                        status: status.as_u16(),
                        body: body_text,
                    };

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::debug!(attempt, status = status.as_u16(), "embedding request retrying");
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(EmbeddingError::Request(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or(EmbeddingError::EmptyResponse))
    }
}

/// Parse an embeddings API response and return `data[0].embedding`.
pub fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or(EmbeddingError::EmptyResponse)?;

    let vec: Vec<f32> = embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    if vec.is_empty() {
        return Err(EmbeddingError::EmptyResponse);
    }
    Ok(vec)
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        _ => Ok(Box::new(DisabledProvider)),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing
/// a BLOB of `vec.len() × 4` bytes.
///
/// ```rust
/// use paper_orbit::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not form a whole `f32`
/// are ignored; callers cross-check the length against the stored `dim`.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_parse_response_first_embedding() {
        let json = serde_json::json!({
            "data": [{"index": 0, "embedding": [0.5, -1.0, 2.0]}],
            "model": "text-embedding-3-small"
        });
        assert_eq!(parse_openai_response(&json).unwrap(), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_parse_response_empty_is_error() {
        let empty = serde_json::json!({"data": []});
        assert!(matches!(
            parse_openai_response(&empty),
            Err(EmbeddingError::EmptyResponse)
        ));
        let blank = serde_json::json!({"data": [{"embedding": []}]});
        assert!(matches!(
            parse_openai_response(&blank),
            Err(EmbeddingError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_disabled_provider_fails() {
        let provider = create_provider(&EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.model_name(), "disabled");
        assert!(matches!(
            provider.embed("hello").await,
            Err(EmbeddingError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_is_not_retried() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 5,
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        let t0 = std::time::Instant::now();
        match provider.embed("hello").await {
            Err(EmbeddingError::MissingCredential(var)) => assert_eq!(var, "OPENAI_API_KEY"),
            other => panic!("expected missing credential, got {:?}", other),
        }
        assert!(t0.elapsed() < Duration::from_secs(1));
    }
}

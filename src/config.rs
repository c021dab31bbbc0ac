//! Configuration parsing and validation.
//!
//! Paper Orbit is configured via a TOML file (default: `config/orbit.toml`).
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/orbit.sqlite"
//!
//! [sources]
//! timeout_ms = 15000
//!
//! [sources.openalex]
//! mailto = "me@example.org"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//!
//! [server]
//! bind = "127.0.0.1:5175"
//! ```
//!
//! Environment variables are only consulted by [`load_config`], which
//! copies the secrets named by `api_key_env` into the skipped `api_key`
//! fields. Nothing downstream reads the process environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::MAX_FILTER_LIMIT;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Defaults everywhere, with the database at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/orbit.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Shared aggregation deadline.
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub openalex: OpenAlexConfig,
    #[serde(default)]
    pub arxiv: ArxivConfig,
    #[serde(default)]
    pub crossref: CrossrefConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_source_timeout_ms(),
            user_agent: default_user_agent(),
            openalex: OpenAlexConfig::default(),
            arxiv: ArxivConfig::default(),
            crossref: CrossrefConfig::default(),
        }
    }
}

fn default_source_timeout_ms() -> u64 {
    15_000
}
fn default_user_agent() -> String {
    format!("paper-orbit/{}", env!("CARGO_PKG_VERSION"))
}
fn default_enabled() -> bool {
    true
}
fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAlexConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_openalex_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub per_request_timeout_secs: u64,
    /// Contact address for the polite pool.
    #[serde(default)]
    pub mailto: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_openalex_url(),
            per_request_timeout_secs: default_request_timeout_secs(),
            mailto: None,
            api_key_env: None,
            api_key: None,
        }
    }
}

fn default_openalex_url() -> String {
    "https://api.openalex.org".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArxivConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_arxiv_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub per_request_timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_arxiv_url(),
            per_request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_arxiv_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrossrefConfig {
    #[serde(default = "default_crossref_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub per_request_timeout_secs: u64,
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            base_url: default_crossref_url(),
            per_request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_crossref_url() -> String {
    "https://api.crossref.org".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Embedding input is cut to this many characters.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_embedding_url(),
            api_key_env: default_api_key_env(),
            api_key: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_input_chars() -> usize {
    6000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Per-source limit for aggregated search when none is given.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_limit")]
    pub local_limit: u32,
    #[serde(default = "default_max_local_limit")]
    pub max_local_limit: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            local_limit: default_limit(),
            max_local_limit: default_max_local_limit(),
        }
    }
}

fn default_limit() -> u32 {
    20
}
fn default_max_local_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5175".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    if let Some(var) = config.sources.openalex.api_key_env.as_deref() {
        config.sources.openalex.api_key = std::env::var(var).ok();
    }
    if config.embedding.is_enabled() {
        config.embedding.api_key = std::env::var(&config.embedding.api_key_env).ok();
    }

    Ok(config)
}

/// Parse and validate TOML without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.sources.timeout_ms == 0 {
        anyhow::bail!("sources.timeout_ms must be > 0");
    }

    let retrieval = &config.retrieval;
    if !(1..=MAX_FILTER_LIMIT).contains(&retrieval.default_limit) {
        anyhow::bail!("retrieval.default_limit must be in 1..={}", MAX_FILTER_LIMIT);
    }
    if retrieval.max_local_limit == 0 {
        anyhow::bail!("retrieval.max_local_limit must be >= 1");
    }
    if !(1..=retrieval.max_local_limit).contains(&retrieval.local_limit) {
        anyhow::bail!(
            "retrieval.local_limit must be in 1..={}",
            retrieval.max_local_limit
        );
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.model.trim().is_empty() {
        anyhow::bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    Ok(())
}

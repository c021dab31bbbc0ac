//! HTTP façade over the retrieval core.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/search` | Aggregated search, returns the per-source bundle |
//! | `POST` | `/api/graph` | Aggregated search, returns the citation graph |
//! | `POST` | `/api/save` | Upsert a paper |
//! | `POST` | `/api/resolve` | Resolve a DOI via Crossref |
//! | `PUT`  | `/api/papers/{id}/summary` | Attach a structured summary |
//! | `POST` | `/api/embed/{id}` | Embed a stored paper |
//! | `POST` | `/api/local-search` | Rank stored papers against a query |
//! | `GET`  | `/api/papers`, `/api/papers/{id}` | Inspect stored papers |
//! | `GET`  | `/api/snapshots`, `/api/snapshots/{id}` | Inspect the search log |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400),
//! `not_found` (404), `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregate::{Aggregator, QueryBundle};
use crate::config::Config;
use crate::embed_cmd::embed_paper;
use crate::embedding;
use crate::error::{EmbeddingError, FilterError, RequestError, SourceError};
use crate::graph::CitationGraph;
use crate::local_search::local_search;
use crate::models::{Paper, SearchFilters};
use crate::papers::resolve_doi;
use crate::rank::ScoredPaper;
use crate::search::{search_and_record, search_graph, with_default_limit};
use crate::store::{PaperStore, SnapshotRecord, SnapshotSummary, SqliteStore};
use crate::summary::{attach_summary, SummaryInput};

const DEFAULT_LIST_LIMIT: usize = 50;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn PaperStore>,
    aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PaperStore>, aggregator: Aggregator) -> Self {
        Self {
            config: Arc::new(config),
            store,
            aggregator: Arc::new(aggregator),
        }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let store = SqliteStore::open(&config.db).await?;
    let aggregator = Aggregator::from_config(config)?;
    let state = AppState::new(config.clone(), Arc::new(store), aggregator);

    println!("orbit server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server starting");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the route table.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/search", post(handle_search))
        .route("/api/graph", post(handle_graph))
        .route("/api/save", post(handle_save))
        .route("/api/resolve", post(handle_resolve))
        .route("/api/papers", get(handle_list_papers))
        .route("/api/papers/{id}", get(handle_get_paper))
        .route("/api/papers/{id}/summary", put(handle_summary))
        .route("/api/embed/{id}", post(handle_embed))
        .route("/api/local-search", post(handle_local_search))
        .route("/api/snapshots", get(handle_list_snapshots))
        .route("/api/snapshots/{id}", get(handle_get_snapshot))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Maps operation errors to the most appropriate HTTP status.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();

        if err.downcast_ref::<FilterError>().is_some() {
            return bad_request(message);
        }
        if let Some(e) = err.downcast_ref::<EmbeddingError>() {
            return match e {
                EmbeddingError::Disabled | EmbeddingError::MissingCredential(_) => AppError {
                    status: StatusCode::BAD_REQUEST,
                    code: "embeddings_disabled",
                    message,
                },
                _ => AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "upstream_error",
                    message,
                },
            };
        }
        if err.downcast_ref::<SourceError>().is_some() {
            return AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error",
                message,
            };
        }
        if let Some(e) = err.downcast_ref::<RequestError>() {
            return match e {
                RequestError::NotFound { .. } => not_found(message),
                RequestError::BadInput(_) => bad_request(message),
            };
        }

        tracing::error!(error = %message, "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Search ============

#[derive(Deserialize)]
struct SearchRequest {
    q: String,
    #[serde(default)]
    filters: SearchFilters,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<QueryBundle>, AppError> {
    let filters = with_default_limit(req.filters, &state.config);
    let bundle =
        search_and_record(state.store.as_ref(), &state.aggregator, &req.q, &filters).await?;
    Ok(Json(bundle))
}

async fn handle_graph(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<CitationGraph>, AppError> {
    let filters = with_default_limit(req.filters, &state.config);
    let graph = search_graph(&state.aggregator, &req.q, &filters).await?;
    Ok(Json(graph))
}

// ============ Papers ============

#[derive(Deserialize)]
struct SaveRequest {
    paper: Paper,
}

async fn handle_save(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<Paper>, AppError> {
    if req.paper.id.trim().is_empty() {
        return Err(bad_request("paper id must not be empty"));
    }
    state.store.upsert_paper(&req.paper).await?;
    let stored = state
        .store
        .get_paper(&req.paper.id)
        .await?
        .ok_or_else(|| not_found(format!("paper not found: {}", req.paper.id)))?;
    Ok(Json(stored))
}

#[derive(Deserialize)]
struct ResolveRequest {
    doi: String,
}

async fn handle_resolve(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<Paper>, AppError> {
    Ok(Json(resolve_doi(&state.config, &req.doi).await?))
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn handle_list_papers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Paper>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.store.list_papers(limit).await?))
}

async fn handle_get_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Paper>, AppError> {
    state
        .store
        .get_paper(&id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("paper not found: {}", id)))
}

#[derive(Deserialize)]
struct SummaryRequest {
    summary: SummaryInput,
}

#[derive(Serialize)]
struct SummaryResponse {
    id: String,
    summary: String,
}

async fn handle_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = attach_summary(state.store.as_ref(), &id, &req.summary).await?;
    Ok(Json(SummaryResponse { id, summary }))
}

// ============ Embeddings ============

#[derive(Serialize)]
struct EmbedResponse {
    ok: bool,
    dim: usize,
    model: String,
}

async fn handle_embed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmbedResponse>, AppError> {
    let provider = embedding::create_provider(&state.config.embedding)
        .map_err(anyhow::Error::from)?;
    let embedding = embed_paper(
        state.store.as_ref(),
        provider.as_ref(),
        &id,
        state.config.embedding.max_input_chars,
    )
    .await?;
    Ok(Json(EmbedResponse {
        ok: true,
        dim: embedding.dim,
        model: embedding.model,
    }))
}

#[derive(Deserialize)]
struct LocalSearchRequest {
    q: String,
    limit: Option<u32>,
}

async fn handle_local_search(
    State(state): State<AppState>,
    Json(req): Json<LocalSearchRequest>,
) -> Result<Json<Vec<ScoredPaper>>, AppError> {
    let retrieval = &state.config.retrieval;
    let limit = req.limit.unwrap_or(retrieval.local_limit);
    if limit == 0 || limit > retrieval.max_local_limit {
        return Err(bad_request(format!(
            "limit must be between 1 and {}",
            retrieval.max_local_limit
        )));
    }

    let provider = embedding::create_provider(&state.config.embedding)
        .map_err(anyhow::Error::from)?;
    let results = local_search(
        state.store.as_ref(),
        provider.as_ref(),
        &req.q,
        limit as usize,
    )
    .await?;
    Ok(Json(results))
}

// ============ Snapshots ============

async fn handle_list_snapshots(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SnapshotSummary>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.store.list_snapshots(limit).await?))
}

async fn handle_get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SnapshotRecord>, AppError> {
    state
        .store
        .get_snapshot(&id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("snapshot not found: {}", id)))
}

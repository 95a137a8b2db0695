use anyhow::{Context, Result};
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use quarry_core::corpus::load_metadata;
use quarry_core::persist::{load_idf, load_index, load_tfidf, IndexPaths};
use quarry_core::vector::DEFAULT_TOP_K;
use quarry_core::{BooleanEngine, DocId, RankingConfig, SearchResult, VectorEngine, Vocabulary};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod repl;

const MAX_K: usize = 100;

pub fn load_boolean_engine(index_path: &FsPath) -> Result<BooleanEngine> {
    let index = load_index(index_path)?;
    tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "boolean index loaded");
    Ok(BooleanEngine::new(index))
}

/// Without `index_path` the vocabulary is taken from the IDF table, which holds the same terms.
pub fn load_vector_engine(idf_path: &FsPath, tfidf_path: &FsPath, metadata_path: &FsPath, index_path: Option<&FsPath>, config: RankingConfig) -> Result<VectorEngine> {
    let idf = load_idf(idf_path)?;
    let tfidf = load_tfidf(tfidf_path)?;
    let docs = load_metadata(metadata_path)?;
    let vocabulary = match index_path {
        Some(path) => Vocabulary::from_index(&load_index(path)?),
        None => Vocabulary::from_terms(idf.keys().cloned()),
    };
    let engine = VectorEngine::new(vocabulary, idf, tfidf, &docs, config);
    tracing::info!(documents = engine.num_docs(), dimensions = engine.vocabulary().len(), "ranking tables loaded");
    Ok(engine)
}

#[derive(Deserialize)]
pub struct BooleanParams {
    pub q: String,
}

#[derive(Deserialize)]
pub struct RankedParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub doc_ids: Vec<DocId>,
}

#[derive(Serialize)]
pub struct RankedResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct AppState {
    pub boolean: Arc<BooleanEngine>,
    pub ranked: Arc<VectorEngine>,
}

/// Serve both engines from a directory holding inverted_index.json, idf.csv and tf-idf.csv.
pub fn build_app<P: AsRef<FsPath>, M: AsRef<FsPath>>(index_dir: P, metadata: M) -> Result<Router> {
    let paths = IndexPaths::new(index_dir);
    let index_json = paths.index_json();
    let boolean = load_boolean_engine(&index_json).context("loading boolean index")?;
    let ranked = load_vector_engine(&paths.idf(), &paths.tfidf(), metadata.as_ref(), Some(index_json.as_path()), RankingConfig::default())
        .context("loading ranking tables")?;
    Ok(router(AppState { boolean: Arc::new(boolean), ranked: Arc::new(ranked) }))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search/boolean", get(boolean_handler))
        .route("/search/ranked", get(ranked_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn boolean_handler(
    State(state): State<AppState>,
    Query(params): Query<BooleanParams>,
) -> Result<Json<BooleanResponse>, (StatusCode, Json<serde_json::Value>)> {
    let start = std::time::Instant::now();
    let doc_ids = state
        .boolean
        .search_sorted(&params.q)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e.to_json())))?;
    let elapsed = start.elapsed();
    Ok(Json(BooleanResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: doc_ids.len(), doc_ids }))
}

pub async fn ranked_handler(State(state): State<AppState>, Query(params): Query<RankedParams>) -> Json<RankedResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_K);
    let mut results = state.ranked.search_top(&params.q, usize::MAX);
    let total_hits = results.len();
    results.truncate(k);
    let elapsed = start.elapsed();
    Json(RankedResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> (StatusCode, Json<serde_json::Value>) {
    match state.ranked.url(&doc_id) {
        Some(url) => (StatusCode::OK, Json(serde_json::json!({ "doc_id": doc_id, "url": url }))),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))),
    }
}

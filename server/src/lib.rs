use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use prf_core::config::{MAX_RESULTS_TO_CONSIDER, RESULTS_PER_PAGE};
use prf_core::persist::{load_bundle, IndexPaths};
use prf_core::tokenizer::tokenize;
use prf_core::{DocId, DocMeta, FeedbackConfig, RankError, RankerConfig, SearchOptions, SearchSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Expand the query with pseudo-relevance feedback
    #[serde(default)]
    pub prf: bool,
    /// Blend importance into the initial cosine scores
    #[serde(default)]
    pub importance: bool,
    /// Re-rank the final list by importance
    #[serde(default)]
    pub post_hoc: bool,
}
fn default_k() -> usize { RESULTS_PER_PAGE }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub expansion_terms: Vec<String>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    pub title: String,
    pub url: Option<String>,
}

/// Startup options of the HTTP front end.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub index_dir: String,
    pub damping: Option<f32>,
    pub importance_multiplier: Option<f32>,
    pub feedback: FeedbackConfig,
    pub request_timeout: Duration,
}

impl ServeConfig {
    pub fn new(index_dir: impl Into<String>) -> Self {
        Self {
            index_dir: index_dir.into(),
            damping: None,
            importance_multiplier: None,
            feedback: FeedbackConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SearchSession>,
    pub docs: Arc<HashMap<DocId, DocMeta>>,
    /// External document id -> doc id.
    pub doc_ids: Arc<HashMap<String, DocId>>,
}

pub fn load_state(config: &ServeConfig) -> Result<AppState> {
    let bundle = load_bundle(&IndexPaths::new(&config.index_dir))?;
    let mut ranker_config = RankerConfig::new(bundle.meta.num_docs);
    if let Some(damping) = config.damping {
        ranker_config.damping = damping;
    }
    if let Some(multiplier) = config.importance_multiplier {
        ranker_config.importance_multiplier = multiplier;
    }
    let session = SearchSession::from_parts(
        bundle.raw_index,
        bundle.doc_tokens,
        bundle.importance,
        bundle.doc_lengths,
        ranker_config,
        config.feedback.clone(),
    )?;
    Ok(AppState { session: Arc::new(session), docs: Arc::new(bundle.docs), doc_ids: Arc::new(bundle.doc_id_map) })
}

pub fn build_app(config: &ServeConfig) -> Result<Router> {
    let app_state = load_state(config)?;

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/doc/external/:external_id", get(external_doc_handler))
        .with_state(app_state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let options = SearchOptions {
        k: params.k.clamp(1, MAX_RESULTS_TO_CONSIDER),
        pseudo_relevance: params.prf,
        blend_importance: params.importance,
        post_hoc_importance: params.post_hoc,
        ..SearchOptions::default()
    };
    let query_terms = tokenize(&params.q);
    // Ranking is CPU bound and runs on the blocking pool.
    let session = Arc::clone(&state.session);
    let outcome = tokio::task::spawn_blocking(move || session.search(&query_terms, &options))
        .await
        .map_err(|e| {
            tracing::error!(query = %params.q, error = %e, "search task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("search task failed: {e}"))
        })?
        .map_err(|e| {
            let status = match e {
                RankError::EmptyQuery | RankError::Configuration(_) => StatusCode::BAD_REQUEST,
                RankError::Domain(_) | RankError::ZeroLengthDocument(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::debug!(query = %params.q, error = %e, "search failed");
            (status, e.to_string())
        })?;

    let results = outcome
        .results
        .into_iter()
        .map(|(doc_id, score)| match state.docs.get(&doc_id) {
            Some(meta) => SearchHit { doc_id, score, title: meta.title.clone(), url: meta.url.clone() },
            None => SearchHit { doc_id, score, title: format!("doc {doc_id}"), url: None },
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::info!(query = %params.q, hits = outcome.total_hits, prf = params.prf, took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: elapsed.as_secs_f64(),
        total_hits: outcome.total_hits,
        expansion_terms: outcome.expansion_terms,
        results,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    doc_json(&state, doc_id)
}

/// Looks a document up by the id it was ingested under.
pub async fn external_doc_handler(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let doc_id = *state
        .doc_ids
        .get(&external_id)
        .ok_or((StatusCode::NOT_FOUND, format!("doc {external_id} not found")))?;
    doc_json(&state, doc_id)
}

fn doc_json(state: &AppState, doc_id: DocId) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let meta = state.docs.get(&doc_id).ok_or((StatusCode::NOT_FOUND, format!("doc {doc_id} not found")))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "external_id": meta.external_id,
        "title": meta.title,
        "url": meta.url,
        "importance": state.session.ranker().importance().score(doc_id),
    })))
}

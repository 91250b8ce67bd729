use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use textindex_core::{DocState, DocumentStore, Hit, IndexError, SledIndex, StoredDocument};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct LookupParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<Hit>,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: String,
    pub state: DocState,
    pub text: String,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<SledIndex>,
}

type ApiError = (StatusCode, String);

fn internal(err: IndexError) -> ApiError {
    tracing::error!(error = %err, "index read failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn cors_layer() -> CorsLayer {
    // CORS_ALLOW_ORIGIN is comma-separated; anything unparsable falls back to Any.
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    }
}

pub fn build_app(index: Arc<SledIndex>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/lookup", get(lookup_handler))
        .route("/doc/*doc_id", get(doc_handler))
        .with_state(AppState { index })
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn lookup_handler(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupResponse>, ApiError> {
    let start = std::time::Instant::now();
    let words: Vec<&str> = params.q.split_whitespace().collect();
    let hits = state.index.lookup(words.as_slice()).map_err(internal)?;
    let results: Vec<Hit> = hits.into_iter().collect();
    Ok(Json(LookupResponse {
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        query: params.q,
        results,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocResponse>, ApiError> {
    let stored = state.index.documents().get(&doc_id).map_err(|e| internal(e.into()))?;
    let Some(doc) = stored else {
        return Err((StatusCode::NOT_FOUND, format!("{doc_id} is not indexed")));
    };
    let doc_state = DocState::from(Some(&doc));
    let text = match doc {
        StoredDocument::Text(text) => text,
        StoredDocument::NoText => String::new(),
    };
    Ok(Json(DocResponse { doc_id, state: doc_state, text }))
}

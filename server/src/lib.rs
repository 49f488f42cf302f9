use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use quarry_core::{Autocomplete, Document, DocumentId, Error, PassSummary, SearchEngine, SearchOutcome};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct AddDocumentRequest {
    pub locator: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct AddFolderRequest {
    pub path: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub admin_token: Option<String>,
}

pub fn build_app(engine: Arc<SearchEngine>, admin_token: Option<String>) -> Router {
    let state = AppState { engine, admin_token };
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/autocomplete", get(autocomplete_handler))
        .route("/documents", post(add_document))
        .route("/documents/folder", post(add_folder))
        .route("/documents/:id", get(document_handler))
        .route("/index/run", post(run_index))
        .with_state(state)
        .layer(cors_from_env())
        .layer(TraceLayer::new_for_http())
}

/// Resolves once `signal` fires. A signal that fails to install is logged and never resolves,
/// so the server keeps running until killed.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::error!(error = %err, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// CORS_ALLOW_ORIGIN (comma-separated) or any origin.
fn cors_from_env() -> CorsLayer {
    let any = || CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                any()
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => any(),
    }
}

fn require_query(q: &str) -> ApiResult<&str> {
    let q = q.trim();
    if q.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "missing query parameter 'q'".into()));
    }
    Ok(q)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> ApiResult<Json<SearchOutcome>> {
    let q = require_query(&params.q)?;
    match state.engine.search(q).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(err) => {
            tracing::error!(error = %err, query = q, "search failed");
            Ok(Json(SearchOutcome { query: q.to_string(), documents: Vec::new(), elapsed_millis: 0 }))
        }
    }
}

pub async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Autocomplete>> {
    let q = require_query(&params.q)?;
    match state.engine.autocomplete(q).await {
        Ok(complete) => Ok(Json(complete)),
        Err(err) => {
            tracing::error!(error = %err, query = q, "autocomplete failed");
            Ok(Json(Autocomplete { query: q.to_string(), suggestions: Vec::new() }))
        }
    }
}

pub async fn document_handler(State(state): State<AppState>, Path(id): Path<DocumentId>) -> ApiResult<Json<Document>> {
    match state.engine.store().get_document(&id).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "not found".into())),
        Err(err) => Err(internal(err)),
    }
}

async fn add_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddDocumentRequest>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    authorize(&state, &headers)?;
    let ext = std::path::Path::new(req.locator.trim()).extension().and_then(|e| e.to_str()).unwrap_or_default();
    if !state.engine.can_parse(ext) {
        let supported = state.engine.supported_extensions().join(", ");
        return Err((StatusCode::UNPROCESSABLE_ENTITY, format!("unsupported file type; expected one of: {supported}")));
    }
    let doc = state
        .engine
        .add_document(&req.locator, req.title.as_deref(), req.description.as_deref())
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn add_folder(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddFolderRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Document>>)> {
    authorize(&state, &headers)?;
    let docs = state.engine.add_directory(&req.path).await.map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(docs)))
}

async fn run_index(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<PassSummary>> {
    authorize(&state, &headers)?;
    state.engine.index_pending().await.map(Json).map_err(internal)
}

fn error_status(err: Error) -> (StatusCode, String) {
    match err {
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        Error::UnsupportedExtension(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        other => internal(other),
    }
}

fn internal(err: Error) -> (StatusCode, String) {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use searchcore::analyzer::field_texts;
use searchcore::{
    Config, DocRecord, Engine, Error, Fields, Filter, FullTextResult, RebuildReport, RemoveMode, Scope,
    SimilarityResult, SimpleResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub default_weights: Arc<BTreeMap<String, f64>>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, default_weights: BTreeMap<String, f64>, admin_token: Option<String>) -> Self {
        Self { engine, default_weights: Arc::new(default_weights), admin_token }
    }
}

#[derive(Deserialize)]
pub struct DocBody {
    pub fields: Fields,
    /// Per-request field weights; the configured defaults apply when absent.
    #[serde(default)]
    pub weights: Option<BTreeMap<String, f64>>,
}

#[derive(Deserialize)]
pub struct RemoveParams {
    #[serde(default)]
    pub keep_record: bool,
}

#[derive(Deserialize)]
pub struct RelatedParams {
    pub k: Option<usize>,
}

#[derive(Deserialize)]
pub struct TextQuery {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub filter: Filter,
    pub k: Option<usize>,
}

#[derive(Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub filter: Filter,
}

#[derive(Deserialize)]
pub struct TermsBody {
    pub terms: Vec<String>,
}

#[derive(Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
}

#[derive(Serialize)]
pub struct BlacklistResponse {
    pub terms: Vec<String>,
    pub changed: usize,
}

/// Open the data directory named by `config` and route requests to it.
/// Mutations require the `ADMIN_TOKEN` environment variable to be set.
pub fn build_app(config: &Config) -> Result<Router> {
    let engine = Engine::open(config)?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState::new(Arc::new(engine), config.default_weights.clone(), admin_token)))
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
        .route("/blacklist", get(blacklist_list).post(blacklist_add).delete(blacklist_remove))
        .route("/:code/:collection/docs/:id", get(get_doc).post(add_doc).put(update_doc).delete(remove_doc))
        .route("/:code/:collection/docs/:id/related", get(related))
        .route("/:code/:collection/search/fulltext", post(search_fulltext))
        .route("/:code/:collection/search/similar", post(search_similar))
        .route("/:code/:collection/search/simple", post(search_simple))
        .route("/:code/:collection/rebuild", post(rebuild))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn status_of(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::TokenizerUnavailable(_) | Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run an engine call off the async workers; sled and the segmenters block.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> searchcore::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(v)) => Ok(Json(v)),
        Ok(Err(e)) => {
            let status = status_of(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "request failed");
            }
            Err((status, e.to_string()))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

fn scope(code: String, collection: String) -> std::result::Result<Scope, (StatusCode, String)> {
    Scope::new(code, collection).map_err(|e| (status_of(&e), e.to_string()))
}

async fn get_doc(State(state): State<AppState>, Path((code, collection, id)): Path<(String, String, String)>) -> ApiResult<DocRecord> {
    let scope = scope(code, collection)?;
    blocking(move || state.engine.store().get(&scope, &id)?.ok_or(Error::NotFound(id))).await
}

async fn add_doc(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((code, collection, id)): Path<(String, String, String)>,
    Json(body): Json<DocBody>,
) -> ApiResult<DocRecord> {
    authorize(&state, &headers)?;
    let scope = scope(code, collection)?;
    blocking(move || {
        let texts = field_texts(&body.fields, body.weights.as_ref().unwrap_or(state.default_weights.as_ref()))?;
        state.engine.add(&scope, &id, &texts, body.fields)
    })
    .await
}

async fn update_doc(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((code, collection, id)): Path<(String, String, String)>,
    Json(body): Json<DocBody>,
) -> ApiResult<DocRecord> {
    authorize(&state, &headers)?;
    let scope = scope(code, collection)?;
    blocking(move || {
        let texts = field_texts(&body.fields, body.weights.as_ref().unwrap_or(state.default_weights.as_ref()))?;
        state.engine.update(&scope, &id, &texts, body.fields)
    })
    .await
}

async fn remove_doc(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((code, collection, id)): Path<(String, String, String)>,
    Query(params): Query<RemoveParams>,
) -> ApiResult<RemoveResponse> {
    authorize(&state, &headers)?;
    let scope = scope(code, collection)?;
    let mode = if params.keep_record { RemoveMode::ClearVector } else { RemoveMode::DeleteRecord };
    blocking(move || Ok(RemoveResponse { removed: state.engine.remove(&scope, &id, mode)? })).await
}

async fn related(
    State(state): State<AppState>,
    Path((code, collection, id)): Path<(String, String, String)>,
    Query(params): Query<RelatedParams>,
) -> ApiResult<SimilarityResult> {
    let scope = scope(code, collection)?;
    blocking(move || state.engine.related(&scope, &id, &Filter::new(), params.k)).await
}

async fn search_fulltext(
    State(state): State<AppState>,
    Path((code, collection)): Path<(String, String)>,
    Json(q): Json<TextQuery>,
) -> ApiResult<FullTextResult> {
    let scope = scope(code, collection)?;
    blocking(move || state.engine.full_text_search(&scope, &q.text, &q.filter)).await
}

async fn search_similar(
    State(state): State<AppState>,
    Path((code, collection)): Path<(String, String)>,
    Json(q): Json<TextQuery>,
) -> ApiResult<SimilarityResult> {
    let scope = scope(code, collection)?;
    blocking(move || state.engine.similarity_search(&scope, &q.text, &q.filter, q.k)).await
}

async fn search_simple(
    State(state): State<AppState>,
    Path((code, collection)): Path<(String, String)>,
    Json(q): Json<FilterQuery>,
) -> ApiResult<SimpleResult> {
    let scope = scope(code, collection)?;
    blocking(move || state.engine.simple_search(&scope, &q.filter)).await
}

async fn rebuild(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((code, collection)): Path<(String, String)>,
) -> ApiResult<RebuildReport> {
    authorize(&state, &headers)?;
    let scope = scope(code, collection)?;
    blocking(move || state.engine.rebuild(&scope)).await
}

async fn blacklist_list(State(state): State<AppState>) -> Json<BlacklistResponse> {
    Json(BlacklistResponse { terms: state.engine.blacklist().terms(), changed: 0 })
}

async fn blacklist_add(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<TermsBody>) -> ApiResult<BlacklistResponse> {
    authorize(&state, &headers)?;
    blocking(move || {
        let changed = state.engine.blacklist().extend(body.terms)?;
        Ok(BlacklistResponse { terms: state.engine.blacklist().terms(), changed })
    })
    .await
}

async fn blacklist_remove(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<TermsBody>) -> ApiResult<BlacklistResponse> {
    authorize(&state, &headers)?;
    blocking(move || {
        let changed = state.engine.blacklist().remove(body.terms)?;
        Ok(BlacklistResponse { terms: state.engine.blacklist().terms(), changed })
    })
    .await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), (StatusCode, String)> {
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

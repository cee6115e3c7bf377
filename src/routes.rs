// HTTP routes.
// JSON views over the repository cache and the blog store.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::blog::{PostService, TagSet};
use crate::error::{FolioError, Result};
use crate::projects::RepositoryCache;

/// Post shown by `GET /blogpost` without an id.
const DEFAULT_POST_ID: &str = "1";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RepositoryCache>,
    pub posts: PostService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/projects", get(projects))
        .route("/blogposts", get(list_posts))
        .route("/blogpost", get(default_post))
        .route("/blogpost/{id}", get(post_by_id))
        .route("/tags", get(tags))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Error surfaced to clients as a JSON body.
struct ApiError(FolioError);

impl From<FolioError> for ApiError {
    fn from(e: FolioError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

/// Run a blocking store call off the async workers.
async fn blocking<T, F>(f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FolioError::Other(format!("store task failed: {}", e)))?
        .map_err(ApiError)
}

async fn projects(State(state): State<AppState>) -> Json<Value> {
    let repos = state.cache.fetch().await;
    Json(json!({ "count": repos.len(), "repos": repos }))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    10
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> std::result::Result<Json<Value>, ApiError> {
    let posts = state.posts.clone();
    let posts = blocking(move || posts.list(query.page, query.limit)).await?;
    Ok(Json(json!({ "count": posts.len(), "posts": posts })))
}

async fn default_post(State(state): State<AppState>) -> std::result::Result<Response, ApiError> {
    show_post(state, DEFAULT_POST_ID.to_string()).await
}

async fn post_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Response, ApiError> {
    show_post(state, id).await
}

async fn show_post(state: AppState, id: String) -> std::result::Result<Response, ApiError> {
    debug!(post_id = %id, "fetching post");
    let posts = state.posts.clone();
    let post = blocking(move || posts.get(&id)).await?;
    Ok(match post {
        Some(post) => Json(json!({ "post": post })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
    })
}

async fn tags() -> Json<Vec<&'static str>> {
    Json(TagSet::available())
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now().timestamp();
    let age = state.cache.snapshot().await.map(|s| s.age(now));
    Json(json!({ "status": "ok", "snapshot_age": age }))
}

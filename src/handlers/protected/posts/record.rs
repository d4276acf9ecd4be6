use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::ValidJson;
use crate::app::AppState;
use crate::database::models::{Post, PostChanges, PostStatus};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<Map<String, Value>>,
    pub status: Option<PostStatus>,
}

impl From<UpdatePostRequest> for PostChanges {
    fn from(req: UpdatePostRequest) -> Self {
        PostChanges {
            title: req.title,
            content: req.content.map(Value::Object),
            status: req.status,
        }
    }
}

fn parse_post_id(id: &str) -> Result<i64, ApiError> {
    id.parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("Invalid post id '{}'", id)))
}

fn post_not_found() -> ApiError {
    ApiError::not_found("Post not found")
}

/// GET /api/posts/:id - show a single post owned by the caller
pub async fn post_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_post_id(&id)?;

    state
        .posts
        .get(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(post_not_found)
}

/// PATCH /api/posts/:id - partial update; bumps `updated_at`
pub async fn post_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_post_id(&id)?;

    let post = state
        .posts
        .update(user.id, id, payload.into())
        .await?
        .ok_or_else(post_not_found)?;

    tracing::info!("User {} updated post {}", user.id, post.id);
    Ok(Json(post))
}

/// DELETE /api/posts/:id
pub async fn post_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_post_id(&id)?;

    if !state.posts.delete(user.id, id).await? {
        return Err(post_not_found());
    }

    tracing::info!("User {} deleted post {}", user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

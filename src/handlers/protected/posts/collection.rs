use axum::{extract::State, http::StatusCode, response::Json, Extension};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::ValidJson;
use crate::app::AppState;
use crate::database::models::{NewPost, Post, DEFAULT_POST_TITLE};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    /// Editor document; must be a JSON object
    pub content: Map<String, Value>,
}

/// GET /api/posts - caller's posts, most recently updated first
pub async fn posts_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.posts.list(user.id).await?;
    Ok(Json(posts))
}

/// POST /api/posts - create a draft owned by the caller
pub async fn posts_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let new_post = NewPost {
        title: payload.title.unwrap_or_else(|| DEFAULT_POST_TITLE.to_string()),
        content: Value::Object(payload.content),
    };

    let post = state.posts.create(user.id, new_post).await?;
    tracing::info!("User {} created post {}", user.id, post.id);

    Ok((StatusCode::CREATED, Json(post)))
}

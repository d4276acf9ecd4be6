use axum::{response::Json, Extension};

use crate::middleware::AuthUser;

/// GET /api/auth/me - the user resolved from the bearer token
pub async fn me_get(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

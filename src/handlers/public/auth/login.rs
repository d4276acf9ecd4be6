// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, response::Json};

use crate::api::ValidJson;
use crate::app::AppState;
use crate::error::ApiError;

use super::utils::{require_valid_email, CredentialsRequest, TokenResponse};

/// POST /api/auth/login - Authenticate credentials and receive a JWT token
///
/// Unknown email and wrong password both answer 401 "Invalid credentials".
pub async fn login_post(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    require_valid_email(&payload.email)?;

    let token = state.auth.login(&payload.email, &payload.password).await?;

    Ok(Json(TokenResponse::bearer(token)))
}

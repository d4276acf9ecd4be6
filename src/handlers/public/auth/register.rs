// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, response::Json};

use crate::api::ValidJson;
use crate::app::AppState;
use crate::auth::MAX_PASSWORD_BYTES;
use crate::error::ApiError;

use super::utils::{require_valid_email, CredentialsRequest, TokenResponse};

/// POST /api/auth/register - Create an account and receive a JWT token
///
/// Input: `{"email": "...", "password": "..."}`
/// Output: `{"access_token": "...", "token_type": "bearer"}`
///
/// An email that is already registered is a 400 with code `BAD_REQUEST`.
pub async fn register_post(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    require_valid_email(&payload.email)?;

    if payload.password.is_empty() {
        return Err(ApiError::field_error("password", "Password cannot be empty"));
    }
    if payload.password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::field_error(
            "password",
            format!("Password cannot exceed {} bytes", MAX_PASSWORD_BYTES),
        ));
    }

    let token = state.auth.register(&payload.email, &payload.password).await?;

    Ok(Json(TokenResponse::bearer(token)))
}

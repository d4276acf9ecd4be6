use axum::{extract::State, response::Json, Extension};
use serde::{Deserialize, Serialize};

use crate::api::ValidJson;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::PromptMode;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    /// Prompt tag; missing means summary, unknown means the general prompt
    #[serde(rename = "type")]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub result: String,
}

/// POST /api/ai/generate - rewrite `text` with the selected prompt
pub async fn generate_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::field_error("text", "Text cannot be empty"));
    }

    let mode = payload
        .mode
        .as_deref()
        .map(PromptMode::from_tag)
        .unwrap_or(PromptMode::Summary);

    tracing::info!("User {} requested '{}' generation", user.id, mode.as_str());

    let result = state.completions.generate(&payload.text, mode).await?;

    Ok(Json(GenerateResponse { result }))
}

//! Brainstorm session endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;

use quill_core::SaveBrainEntryRequest;

use crate::{ApiError, AppState, AuthUser};

/// Latest brainstorm entry for the user, or `{}` when none exists yet.
pub async fn load_brainstorm(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.db.brainstorm.latest(user_id).await? {
        Some(entry) => Ok(Json(serde_json::to_value(entry).map_err(|e| {
            ApiError::Internal(format!("Serialization failed: {}", e))
        })?)),
        None => Ok(Json(json!({}))),
    }
}

/// Store a brainstorm snapshot. Completing all five W answers also records
/// the milestone in the planning timeline.
pub async fn save_brainstorm(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<SaveBrainEntryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let entry = state.db.save_brainstorm(user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
pub struct ProgressRequest {
    pub completed: bool,
}

pub async fn set_brainstorm_progress(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<ProgressRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .brainstorm
        .set_progress(user_id, request.completed)
        .await?;
    Ok(Json(json!({ "msg": "Progress updated" })))
}

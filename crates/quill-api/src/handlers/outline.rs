//! Outline endpoints. Reads return `{"success": true, "data": ...}` to match
//! the frontend contract; saves replace the owner's whole outline.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use quill_core::{SectionDescriptor, SectionPatch};

use crate::{ApiError, AppState, AuthUser};

pub async fn get_outline(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let forest = state.db.sections.list_forest(user_id).await?;
    Ok(Json(json!({ "success": true, "data": forest })))
}

pub async fn get_section(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let node = state.db.sections.get_subtree(user_id, id).await?;
    Ok(Json(json!({ "success": true, "data": node })))
}

pub async fn save_outline(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(trees): Json<Vec<SectionDescriptor>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.db.sections.replace_all(user_id, &trees).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Outline saved" })),
    ))
}

pub async fn update_section(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SectionPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let node = state.db.sections.update(user_id, id, patch).await?;
    Ok(Json(json!({ "success": true, "data": node })))
}

pub async fn delete_section(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.sections.delete_subtree(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

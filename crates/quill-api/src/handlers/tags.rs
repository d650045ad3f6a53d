//! Tag endpoints for the reference board.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use quill_core::{Reference, ReferenceWithTags, Tag, TagStat};

use crate::{ApiError, AppState, AuthUser};

#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

pub async fn create_tag(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let tag = state.db.tags.get_or_create(user_id, &request.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn list_tags(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.db.tags.list(user_id).await?))
}

pub async fn tag_stats(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TagStat>>, ApiError> {
    Ok(Json(state.db.tags.stats(user_id).await?))
}

#[derive(Deserialize)]
pub struct TagAssignmentRequest {
    pub reference_id: Uuid,
    pub tag: String,
}

/// Attach a tag to a reference, creating the tag when needed.
pub async fn assign_tag(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<TagAssignmentRequest>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state
        .db
        .tags
        .assign(user_id, request.reference_id, &request.tag)
        .await?;
    Ok(Json(tag))
}

pub async fn references_with_tags(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReferenceWithTags>>, ApiError> {
    Ok(Json(state.db.tags.references_with_tags(user_id).await?))
}

pub async fn remove_tag(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<TagAssignmentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .tags
        .remove(user_id, request.reference_id, &request.tag)
        .await?;
    Ok(Json(json!({ "msg": "Tag removed" })))
}

fn default_completed() -> bool {
    true
}

#[derive(Deserialize)]
pub struct MarkCompleteRequest {
    pub reference_id: Uuid,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

/// Flip the read/processed flag shown on the reference board.
pub async fn mark_reference_complete(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<MarkCompleteRequest>,
) -> Result<Json<Reference>, ApiError> {
    let reference = state
        .db
        .references
        .set_completed(user_id, request.reference_id, request.completed)
        .await?;
    Ok(Json(reference))
}

#[derive(Deserialize)]
pub struct RenameTagRequest {
    pub name: String,
}

pub async fn rename_tag(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameTagRequest>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state.db.tags.rename(user_id, id, &request.name).await?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.tags.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

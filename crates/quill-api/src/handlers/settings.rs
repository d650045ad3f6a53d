//! Settings and profile endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;

use quill_core::{UpdateSettingsRequest, UserSettings};

use crate::{ApiError, AppState, AuthUser};

/// Settings merged with the account's profile fields, which is what the
/// settings page renders.
pub async fn get_settings(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let settings = state.db.settings.get_or_create(user_id).await?;
    let user = state.db.users.get(user_id).await?;
    Ok(Json(json!({
        "language": settings.language,
        "theme": settings.theme,
        "email_notifications": settings.email_notifications,
        "username": user.username,
        "email": user.email,
    })))
}

pub async fn update_settings(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<UserSettings>, ApiError> {
    let settings = state.db.settings.update(user_id, request).await?;
    Ok(Json(settings))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

pub async fn update_profile(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .db
        .users
        .update_profile(user_id, request.username.as_deref(), request.email.as_deref())
        .await?;
    Ok(Json(json!({
        "username": user.username,
        "email": user.email,
    })))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .users
        .change_password(user_id, &request.old_password, &request.new_password)
        .await?;
    Ok(Json(json!({ "msg": "Password changed" })))
}

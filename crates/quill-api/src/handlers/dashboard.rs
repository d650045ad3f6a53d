//! Dashboard overview: the five canonical phases with derived statuses.

use axum::{extract::State, Json};
use serde_json::json;

use quill_core::phases::reference_now;

use crate::{ApiError, AppState, AuthUser};

pub async fn dashboard_phases(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state.db.planning.overview(user_id, reference_now()).await?;
    Ok(Json(json!({ "code": 0, "data": entries })))
}

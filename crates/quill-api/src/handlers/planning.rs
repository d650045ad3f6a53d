//! Planning timeline endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use quill_core::{PhaseDescriptor, PhaseWithTasks, SectionDescriptor, SectionNode};

use crate::{ApiError, AppState, AuthUser};

/// Both halves of the plan: the outline forest under `sections` and the
/// phase list under `timeline`.
#[derive(Serialize)]
pub struct PlanningResponse {
    pub sections: Vec<SectionNode>,
    pub timeline: Vec<PhaseWithTasks>,
}

pub async fn get_planning(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PlanningResponse>, ApiError> {
    let sections = state.db.sections.list_forest(user_id).await?;
    let timeline = state.db.planning.fetch_timeline(user_id).await?;
    Ok(Json(PlanningResponse { sections, timeline }))
}

/// The full plan payload. Both halves are optional; an empty payload clears
/// the plan.
#[derive(Deserialize)]
pub struct SavePlanningRequest {
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
    #[serde(default)]
    pub timeline: Vec<PhaseDescriptor>,
}

/// Replace the user's outline and timeline together in one transaction.
pub async fn save_planning(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<SavePlanningRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .replace_planning(user_id, &request.sections, &request.timeline)
        .await?;
    Ok(Json(json!({ "msg": "Planning saved" })))
}

pub async fn delete_phase(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(phase_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.planning.delete_phase(user_id, phase_id).await?;
    Ok(Json(json!({ "msg": "Phase deleted" })))
}

pub async fn toggle_task(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path((phase_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let completed = state
        .db
        .planning
        .toggle_task(user_id, phase_id, task_id)
        .await?;
    Ok(Json(json!({ "completed": completed })))
}

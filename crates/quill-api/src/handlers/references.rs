//! Bibliographic reference endpoints, including BibTeX import and citation
//! formatting.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use quill_core::{
    bibtex,
    citation::{format_citation, CitationStyle},
    CreateReferenceRequest, Reference, UpdateReferenceRequest,
};
use quill_db::ReferenceSort;

use crate::{ApiError, AppState, AuthUser};

pub async fn create_reference(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<CreateReferenceRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let reference = state.db.references.create(user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(reference)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub sort_by: Option<String>,
}

pub async fn list_references(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Reference>>, ApiError> {
    let sort = query
        .sort_by
        .as_deref()
        .map(ReferenceSort::parse)
        .unwrap_or_default();
    let references = state.db.references.list(user_id, sort).await?;
    Ok(Json(references))
}

pub async fn update_reference(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReferenceRequest>,
) -> Result<Json<Reference>, ApiError> {
    let reference = state.db.references.update(user_id, id, &request).await?;
    Ok(Json(reference))
}

pub async fn delete_reference(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.references.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Import references from an uploaded `.bib` file. Entries without a title
/// are skipped; the rest are inserted in one transaction.
pub async fn upload_bibtex(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut content: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Unreadable upload: {}", e)))?;
            content = Some(text);
        }
    }
    let content =
        content.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let requests: Vec<CreateReferenceRequest> = bibtex::parse(&content)
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title?;
            if title.trim().is_empty() {
                return None;
            }
            Some(CreateReferenceRequest {
                title,
                authors: entry.authors.unwrap_or_default(),
                year: entry.year.unwrap_or_default(),
                source: entry.source.unwrap_or_default(),
                doi: entry.doi,
                url: entry.url,
            })
        })
        .collect();

    let created = state.db.references.create_many(user_id, &requests).await?;
    info!(
        subsystem = "api",
        component = "references",
        op = "upload_bib",
        user_id = %user_id,
        count = created.len(),
        "BibTeX import finished"
    );
    Ok(Json(json!({ "count": created.len(), "created": created })))
}

#[derive(Deserialize)]
pub struct CiteQuery {
    pub style: Option<String>,
}

/// Format a reference as a citation string in the requested style.
pub async fn cite_reference(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CiteQuery>,
) -> Result<String, ApiError> {
    let style_name = query.style.as_deref().unwrap_or("apa");
    let style = CitationStyle::parse(style_name)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown citation style '{}'", style_name)))?;
    let reference = state.db.references.get(user_id, id).await?;
    Ok(format_citation(style, &reference))
}

//! Cloud document endpoints. Versions are addressed by label ("v1.2") in
//! URLs and resolved to rows here; blob bytes are served from `/files`.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use quill_core::{DocumentVersion, VersionNumber};
use quill_db::PgDocumentRepository;

use crate::{ApiError, AppState, AuthUser};

fn documents(state: &AppState) -> Result<&PgDocumentRepository, ApiError> {
    state
        .db
        .documents
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Document storage is not configured".to_string()))
}

/// Resolve a "vM.m" label against a document's stored versions.
async fn resolve_version(
    repo: &PgDocumentRepository,
    user_id: Uuid,
    document_id: Uuid,
    label: &str,
) -> Result<DocumentVersion, ApiError> {
    let wanted = VersionNumber::parse_label(label)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid version label '{}'", label)))?;
    let document = repo.get(user_id, document_id).await?;
    document
        .versions
        .into_iter()
        .find(|v| v.major_version == wanted.major && v.minor_version == wanted.minor)
        .ok_or_else(|| ApiError::NotFound(format!("Version {} not found", label)))
}

/// Create a document from its first upload. Multipart fields: `title` (text)
/// and `file` (the blob).
pub async fn create_document(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable title: {}", e)))?;
                title = Some(text);
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.bin").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable upload: {}", e)))?;
                file = Some((name, data.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| ApiError::BadRequest("Missing 'title' field".to_string()))?;
    let (filename, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let document = documents(&state)?
        .create_document(user_id, &title, &filename, &data)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "code": 0, "data": document })),
    ))
}

pub async fn list_documents(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let docs = documents(&state)?.list(user_id).await?;
    Ok(Json(json!({ "code": 0, "data": docs })))
}

/// Upload a new version of an existing document. Multipart field: `file`.
pub async fn upload_document_version(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload.bin").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Unreadable upload: {}", e)))?;
            file = Some((name, data.to_vec()));
        }
    }
    let (filename, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let version = documents(&state)?
        .upload_version(user_id, id, &filename, &data)
        .await?;
    Ok(Json(json!({
        "code": 0,
        "version": version.label(),
        "data": version,
    })))
}

/// Hand back the stored blob's URL; the `/files` service serves the bytes.
pub async fn download_document_version(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path((id, label)): Path<(Uuid, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = documents(&state)?;
    let version = resolve_version(repo, user_id, id, &label).await?;
    Ok(Json(json!({ "code": 0, "file_url": version.file_url })))
}

pub async fn delete_document_version(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path((id, label)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    let repo = documents(&state)?;
    let version = resolve_version(repo, user_id, id, &label).await?;
    repo.delete_version(user_id, id, version.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_document(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    documents(&state)?.delete_document(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

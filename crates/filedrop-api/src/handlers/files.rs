use crate::error::{ErrorResponse, HttpAppError};
use crate::services::UploadReceipt;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use filedrop_core::models::FileMetadata;
use filedrop_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Accept a file for asynchronous processing.
///
/// The response only confirms the file is stored and queued; poll
/// `GET /api/v0/files/{id}` for the digest.
#[utoipa::path(
    post,
    path = "/api/v0/files",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "File stored and queued for processing", body = UploadReceipt),
        (status = 400, description = "Missing or duplicate 'file' field", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 503, description = "Processing queue full or server shutting down", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let receipt = state.ingestion.ingest_multipart(multipart).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

#[utoipa::path(
    get,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File found", body = FileMetadata),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "get_file"))]
pub async fn get_file(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let file = state
        .metadata
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    Ok(Json(file))
}

#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    responses(
        (status = 200, description = "All files, oldest first", body = Vec<FileMetadata>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_files"))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = state.metadata.list_all().await?;
    tracing::debug!(count = files.len(), "Listed files");
    Ok(Json(files))
}

//! Supporting document upload and retrieval.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use cred_core::{AppError, Violations};
use cred_db::{Document, NewDocumentParams};
use http::{StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::core::document_store::document_key;
use crate::startup::AppState;

/// Upload ceiling. The HTTP body limit is set slightly above this so
/// the handler can report the violation instead of a blunt 413.
const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted file extensions, compared case-insensitively.
const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub doc_type: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            registration_id: d.registration_id,
            doc_type: d.doc_type,
            file_name: d.file_name,
            content_type: d.content_type,
            size_bytes: d.size_bytes,
            uploaded_at: d.uploaded_at,
        }
    }
}

/// Multipart fields collected from an upload request.
#[derive(Debug, Default)]
struct UploadParts {
    registration: Option<String>,
    doc_type: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Option<Vec<u8>>,
}

/// `POST /api/documents` — public multipart upload.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let parts = read_multipart(multipart).await?;
    let (registration_id, doc_type, file_name) = validate_upload(&parts)?;

    // Confirms the registration exists before any bytes are stored.
    let registration = state.db.registrations.get(registration_id).await?;

    let data = parts.data.unwrap_or_default();
    let content_type = parts
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let size_bytes = data.len() as i64;

    let key = document_key(registration.id, Uuid::new_v4(), &file_name);
    state.store.put(&key, &content_type, data).await?;

    let document = state
        .db
        .documents
        .create(NewDocumentParams {
            registration_id: registration.id,
            doc_type: &doc_type,
            file_name: &file_name,
            file_key: &key,
            content_type: &content_type,
            size_bytes,
        })
        .await?;

    info!(
        document_id = %document.id,
        registration_id = %registration.id,
        doc_type = %document.doc_type,
        size_bytes,
        "Document uploaded"
    );

    Ok((StatusCode::CREATED, Json(document.into())))
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadParts, AppError> {
    let mut parts = UploadParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidArgument(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("registration") => {
                parts.registration = Some(field.text().await.map_err(|e| {
                    AppError::InvalidArgument(format!("Invalid registration field: {e}"))
                })?);
            }
            Some("doc_type") => {
                parts.doc_type = Some(field.text().await.map_err(|e| {
                    AppError::InvalidArgument(format!("Invalid doc_type field: {e}"))
                })?);
            }
            _ if field.file_name().is_some() => {
                parts.file_name = field.file_name().map(str::to_string);
                parts.content_type = field.content_type().map(str::to_string);
                parts.data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            AppError::InvalidArgument(format!("Failed to read file: {e}"))
                        })?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    Ok(parts)
}

/// Check the collected parts, reporting every problem at once.
fn validate_upload(parts: &UploadParts) -> Result<(Uuid, String, String), AppError> {
    let mut violations = Violations::new();

    let registration_id = match parts.registration.as_deref().map(Uuid::parse_str) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            violations.add("registration", "Must be a valid registration id");
            None
        }
        None => {
            violations.add("registration", "This field is required");
            None
        }
    };

    let doc_type = parts.doc_type.as_deref().map(str::trim).unwrap_or_default();
    if doc_type.is_empty() {
        violations.add("doc_type", "This field is required");
    }

    match (&parts.file_name, &parts.data) {
        (Some(name), Some(data)) => {
            if !has_allowed_extension(name) {
                violations.add(
                    "file",
                    "File type not allowed. Accepted: pdf, jpg, jpeg, png",
                );
            }
            if data.len() > MAX_FILE_BYTES {
                violations.add("file", "File exceeds the 5 MiB limit");
            }
            if data.is_empty() {
                violations.add("file", "File is empty");
            }
        }
        _ => violations.add("file", "A file part is required"),
    }

    violations.finish()?;

    // Violations were empty, so all three are present.
    match (registration_id, parts.file_name.clone()) {
        (Some(id), Some(file_name)) => Ok((id, doc_type.to_string(), file_name)),
        _ => Err(AppError::Internal(
            "Upload validation accepted incomplete parts".to_string(),
        )),
    }
}

fn has_allowed_extension(file_name: &str) -> bool {
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return false;
    };
    let lowered = extension.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&lowered.as_str())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentListQuery {
    pub registration: Option<Uuid>,
}

/// `GET /api/documents?registration={id}` — metadata listing.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let documents = state.db.documents.list(query.registration).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

/// `GET /api/documents/{id}` — single document metadata.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state.db.documents.get(id).await?;
    Ok(Json(document.into()))
}

/// `GET /api/documents/{id}/download` — where to fetch the bytes.
///
/// S3-backed deployments get a presigned URL; local storage points back
/// at the `/file` endpoint.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let document = state.db.documents.get(id).await?;
    let url = state.store.download_url(&document.file_key, document.id).await?;
    Ok(Json(json!({ "url": url })))
}

/// `GET /api/documents/{id}/file` — stream the stored bytes.
pub async fn file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document = state.db.documents.get(id).await?;
    let bytes = state.store.get(&document.file_key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

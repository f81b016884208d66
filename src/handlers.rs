use axum::{Json, extract::{Multipart, Path, Query, State}, http::header, response::Response};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::*,
    state::AppState,
    storage::Storage,
    utils::{file_name_from_path, random_share_code, sanitize_file_name, storage_path},
};

/// Bounded retry count for the share-code collision loop.
const SHARE_CODE_ATTEMPTS: usize = 32;

/// Register metadata for a file the client already delivered to the
/// messaging backend.
pub async fn register_upload(
    State(state): State<AppState>,
    Json(req): Json<RegisterUploadRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.file_id.is_empty() || req.file_name.is_empty() || req.uploader_id.is_empty() {
        return Err(AppError::BadRequest(
            "fileId, fileName and uploaderId are required".to_string(),
        ));
    }

    let file_name = sanitize_file_name(&req.file_name);
    if file_name.is_empty() {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }

    insert_file_record(
        &state,
        &req.file_id,
        &file_name,
        &req.uploader_id,
        StorageKind::Telegram,
    )
    .await?;

    info!("Registered telegram file {} for {}", req.file_id, req.uploader_id);

    Ok(Json(SuccessResponse { success: true }))
}

/// Upload a file to the object-storage backend using multipart/form-data.
pub async fn fast_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FastUploadResponse>, AppError> {
    // Temporary holders for multipart fields
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut uploader_id: Option<String> = None;

    // Parse multipart fields
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Error parsing multipart: {}", e);
        AppError::Multipart(format!("Failed to parse multipart form: {}", e))
    })? {
        match field.name().unwrap_or("") {
            "document" => {
                let data = field.bytes().await.map_err(|e| {
                    error!("Error reading file bytes: {}", e);
                    AppError::Multipart(format!("Failed to read the file: {}", e))
                })?;
                file_data = Some(data);
            }
            "fileName" => {
                if let Ok(name) = field.text().await {
                    if !name.is_empty() {
                        file_name = Some(name);
                    }
                }
            }
            "uploaderId" => {
                if let Ok(id) = field.text().await {
                    if !id.is_empty() {
                        uploader_id = Some(id);
                    }
                }
            }
            _ => {}
        }
    }

    // Ensure all required fields arrived
    let file_data = file_data
        .ok_or_else(|| AppError::BadRequest("Missing file, fileName, or uploaderId".into()))?;
    let file_name = file_name
        .ok_or_else(|| AppError::BadRequest("Missing file, fileName, or uploaderId".into()))?;
    let uploader_id = uploader_id
        .ok_or_else(|| AppError::BadRequest("Missing file, fileName, or uploaderId".into()))?;

    // Enforce maximum file size
    let file_size = file_data.len() as u64;
    if file_size > state.config.max_file_size {
        error!(
            "File size {} exceeds maximum limit of {} bytes",
            file_size, state.config.max_file_size
        );

        return Err(AppError::FileTooLarge(format!(
            "File size {} exceeds maximum limit of {} bytes",
            file_size, state.config.max_file_size
        )));
    }

    let file_name = sanitize_file_name(&file_name);
    if file_name.is_empty() {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }

    // The storage key doubles as the public file identifier
    let path = storage_path(&uploader_id, &file_name);

    if state.storage.exists(&path).await? {
        return Err(AppError::Conflict("File already exists".to_string()));
    }

    // Upload file to the storage backend
    state.storage.upload(&path, file_data).await.map_err(|e| {
        error!("Error uploading file: {}", e);
        AppError::Upstream("Failed to upload file".into())
    })?;

    // Persist file metadata; the object must not outlive a failed insert
    if let Err(e) = insert_file_record(
        &state,
        &path,
        &file_name,
        &uploader_id,
        StorageKind::Fast,
    )
    .await
    {
        error!("Database insert failed after upload of {}: {}", path, e);
        if let Err(cleanup) = state.storage.delete(&path).await {
            warn!("Could not remove orphaned object {}: {}", path, cleanup);
        }
        return Err(e);
    }

    info!("File uploaded: {} ({} bytes)", path, file_size);

    Ok(Json(FastUploadResponse {
        success: true,
        file_id: path,
    }))
}

/// List a user's files, optionally filtered by storage kind, newest first.
pub async fn list_files(
    State(state): State<AppState>,
    Json(req): Json<ListFilesRequest>,
) -> Result<Json<Vec<FileRecord>>, AppError> {
    if req.uploader_id.is_empty() {
        return Err(AppError::BadRequest("uploaderId is required".to_string()));
    }

    let files = match req.storage_kind {
        Some(kind) => {
            sqlx::query_as::<_, FileRecord>(
                "SELECT id, file_id, file_name, uploader_id, storage_kind, created_at \
                 FROM files WHERE uploader_id = $1 AND storage_kind = $2 \
                 ORDER BY created_at DESC",
            )
            .bind(&req.uploader_id)
            .bind(kind.as_str())
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, FileRecord>(
                "SELECT id, file_id, file_name, uploader_id, storage_kind, created_at \
                 FROM files WHERE uploader_id = $1 \
                 ORDER BY created_at DESC",
            )
            .bind(&req.uploader_id)
            .fetch_all(&state.pool)
            .await?
        }
    };

    Ok(Json(files))
}

/// Delete a file record and, where the backend supports it, the stored
/// object. Unknown identifiers are treated as already deleted.
pub async fn delete_file(
    State(state): State<AppState>,
    Json(req): Json<DeleteFileRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.file_id.is_empty() {
        return Err(AppError::BadRequest("fileId is required".to_string()));
    }

    let record = sqlx::query_as::<_, FileRecord>(
        "SELECT id, file_id, file_name, uploader_id, storage_kind, created_at \
         FROM files WHERE file_id = $1",
    )
    .bind(&req.file_id)
    .fetch_optional(&state.pool)
    .await?;

    // Idempotent: deleting something that is already gone is a success
    let Some(record) = record else {
        return Ok(Json(SuccessResponse { success: true }));
    };

    // For the fast backend the identifier is the storage key; the bot
    // backend exposes no per-file delete, so its bytes stay behind.
    if record.storage_kind == StorageKind::Fast.as_str() {
        state.storage.delete(&record.file_id).await.map_err(|e| {
            error!("Failed to delete object {}: {}", record.file_id, e);
            AppError::Upstream("Failed to delete file from storage".to_string())
        })?;
    }

    sqlx::query("DELETE FROM files WHERE file_id = $1")
        .bind(&req.file_id)
        .execute(&state.pool)
        .await?;

    info!("File deleted: {}", req.file_id);

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct FileUrlParams {
    pub file_id: Option<String>,
}

/// Resolve a messaging-backend file identifier to an ephemeral signed URL.
pub async fn get_file_url(
    State(state): State<AppState>,
    Query(params): Query<FileUrlParams>,
) -> Result<Json<FileUrlResponse>, AppError> {
    let file_id = params
        .file_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("File ID required".to_string()))?;

    let file_url = state.telegram.file_url(&file_id).await?;

    Ok(Json(FileUrlResponse { file_url }))
}

/// Stream a fast-backend object with a download content-disposition.
pub async fn fast_download(
    State(state): State<AppState>,
    Json(req): Json<FileIdRequest>,
) -> Result<Response, AppError> {
    if req.file_id.is_empty() {
        return Err(AppError::BadRequest("File ID required".to_string()));
    }

    let content = state.storage.download(&req.file_id).await?;
    let file_name = file_name_from_path(&req.file_id).to_string();

    let mut response = Response::new(content.into());

    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/octet-stream"),
    );

    // Preserve the display name when the browser saves the file
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        header::HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
            .unwrap_or_else(|_| header::HeaderValue::from_static("attachment")),
    );

    Ok(response)
}

/// Create an anonymous share code for an uploaded file.
pub async fn create_share(
    State(state): State<AppState>,
    Json(req): Json<ShareRequest>,
) -> Result<Json<ShareCodeResponse>, AppError> {
    if req.file_id.is_empty() || req.file_name.is_empty() {
        return Err(AppError::BadRequest(
            "fileId and fileName are required".to_string(),
        ));
    }

    let file_name = sanitize_file_name(&req.file_name);
    if file_name.is_empty() {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }

    // Draw codes until one is free among active codes
    let mut code = None;
    for _ in 0..SHARE_CODE_ATTEMPTS {
        let candidate = random_share_code();
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM share_codes WHERE code = $1",
        )
        .bind(&candidate)
        .fetch_one(&state.pool)
        .await?;

        if taken == 0 {
            code = Some(candidate);
            break;
        }
    }
    let code = code.ok_or_else(|| {
        AppError::Upstream("Could not allocate a unique share code".to_string())
    })?;

    sqlx::query(
        "INSERT INTO share_codes (id, code, file_id, file_name) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(&req.file_id)
    .bind(&file_name)
    .execute(&state.pool)
    .await?;

    info!("Share code created for {}", req.file_id);

    Ok(Json(ShareCodeResponse { code }))
}

/// Resolve a share code to the file it maps to. Read-only: the code
/// stays valid after retrieval.
pub async fn resolve_share(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SharedFileResponse>, AppError> {
    if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Invalid share code".to_string()));
    }

    let share = sqlx::query_as::<_, ShareCode>(
        "SELECT id, code, file_id, file_name, created_at FROM share_codes WHERE code = $1",
    )
    .bind(&code)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("No file for that code".to_string()))?;

    Ok(Json(SharedFileResponse {
        file_id: share.file_id,
        file_name: share.file_name,
        created_at: share.created_at,
    }))
}

async fn insert_file_record(
    state: &AppState,
    file_id: &str,
    file_name: &str,
    uploader_id: &str,
    kind: StorageKind,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO files (id, file_id, file_name, uploader_id, storage_kind) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(file_id)
    .bind(file_name)
    .bind(uploader_id)
    .bind(kind.as_str())
    .execute(&state.pool)
    .await?;

    Ok(())
}

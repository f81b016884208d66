use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Which external backend holds a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Telegram,
    Fast,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Telegram => "telegram",
            StorageKind::Fast => "fast",
        }
    }
}

/// Metadata row describing an uploaded file.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_id: String,
    pub file_name: String,
    pub uploader_id: String,
    pub storage_kind: String,
    pub created_at: DateTime<Utc>,
}

/// Anonymous-sharing row: a short numeric code mapped to a file.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ShareCode {
    pub id: Uuid,
    pub code: String,
    pub file_id: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUploadRequest {
    pub file_id: String,
    pub file_name: String,
    pub uploader_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesRequest {
    pub uploader_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_kind: Option<StorageKind>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    pub file_id: String,
}

/// Body for routes that take the raw backend identifier, matching the
/// `file_id` wire name used by the download endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileIdRequest {
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub file_id: String,
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastUploadResponse {
    pub success: bool,
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUrlResponse {
    pub file_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareCodeResponse {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileResponse {
    pub file_id: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_round_trips_lowercase() {
        let kind: StorageKind = serde_json::from_str("\"telegram\"").unwrap();
        assert_eq!(kind, StorageKind::Telegram);
        assert_eq!(serde_json::to_string(&StorageKind::Fast).unwrap(), "\"fast\"");
        assert_eq!(StorageKind::Telegram.as_str(), "telegram");
    }

    #[test]
    fn request_fields_are_camel_case() {
        let req: RegisterUploadRequest = serde_json::from_str(
            r#"{"fileId":"abc","fileName":"notes.txt","uploaderId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(req.file_id, "abc");
        assert_eq!(req.file_name, "notes.txt");
        assert_eq!(req.uploader_id, "u1");
    }

    #[test]
    fn list_request_storage_kind_is_optional() {
        let req: ListFilesRequest =
            serde_json::from_str(r#"{"uploaderId":"u1"}"#).unwrap();
        assert!(req.storage_kind.is_none());

        let req: ListFilesRequest =
            serde_json::from_str(r#"{"uploaderId":"u1","storageKind":"fast"}"#).unwrap();
        assert_eq!(req.storage_kind, Some(StorageKind::Fast));
    }
}

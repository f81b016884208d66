use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    models::*,
    queue::{QueueError, UploadQueue},
    telegram::{TelegramClient, TelegramError},
};

/// How long a succeeded row stays visible before it is cleared.
const SUCCESS_DISPLAY_DELAY: Duration = Duration::from_millis(1500);

/// How a batch is submitted to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// One request in flight at a time, in drop order.
    Sequential,
    /// All entries submitted at once; settles land as responses arrive.
    Parallel,
}

/// A file picked up from the user's machine, keyed by its name.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Programmatic client for the CloudGram API, mirroring the browser
/// actions: upload to either backend, list, delete, resolve download
/// URLs, and share anonymously.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    telegram: TelegramClient,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, telegram: TelegramClient) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            telegram,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload one file to the messaging backend: send the document to the
    /// bot, then register its metadata.
    pub async fn upload_telegram(
        &self,
        uploader_id: &str,
        file: &LocalFile,
    ) -> Result<String, ClientError> {
        let file_id = self
            .telegram
            .send_document(&file.name, file.bytes.clone())
            .await?;

        let body = RegisterUploadRequest {
            file_id: file_id.clone(),
            file_name: file.name.clone(),
            uploader_id: uploader_id.to_string(),
        };
        let _: SuccessResponse = self
            .post_json("/api/upload", &body)
            .await?;

        Ok(file_id)
    }

    /// Upload one file to the object-storage backend.
    pub async fn upload_fast(
        &self,
        uploader_id: &str,
        file: &LocalFile,
    ) -> Result<String, ClientError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone());
        let form = reqwest::multipart::Form::new()
            .part("document", part)
            .text("fileName", file.name.clone())
            .text("uploaderId", uploader_id.to_string());

        let response = self
            .http
            .post(self.url("/api/fast/upload"))
            .multipart(form)
            .send()
            .await?;

        let body: FastUploadResponse = decode(response).await?;
        Ok(body.file_id)
    }

    pub async fn list_files(
        &self,
        uploader_id: &str,
        storage_kind: Option<StorageKind>,
    ) -> Result<Vec<FileRecord>, ClientError> {
        let body = ListFilesRequest {
            uploader_id: uploader_id.to_string(),
            storage_kind,
        };
        self.post_json("/api/files", &body).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), ClientError> {
        let body = DeleteFileRequest {
            file_id: file_id.to_string(),
        };
        let _: SuccessResponse = self.post_json("/api/delete", &body).await?;
        Ok(())
    }

    /// Resolve a messaging-backend identifier to its ephemeral URL.
    pub async fn file_url(&self, file_id: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.url("/api/file-url"))
            .query(&[("file_id", file_id)])
            .send()
            .await?;
        let body: FileUrlResponse = decode(response).await?;
        Ok(body.file_url)
    }

    /// Fetch a fast-backend object's bytes.
    pub async fn fast_download(&self, file_id: &str) -> Result<Bytes, ClientError> {
        let body = FileIdRequest {
            file_id: file_id.to_string(),
        };
        let response = self
            .http
            .post(self.url("/api/fast/download"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(extract_api_error(response).await);
        }
        Ok(response.bytes().await?)
    }

    /// Anonymous sharing: deliver the file to the bot, then mint a code
    /// for it. No uploader identity involved.
    pub async fn share_anonymous(&self, file: &LocalFile) -> Result<String, ClientError> {
        let file_id = self
            .telegram
            .send_document(&file.name, file.bytes.clone())
            .await?;

        let body = ShareRequest {
            file_id,
            file_name: file.name.clone(),
        };
        let resp: ShareCodeResponse = self.post_json("/api/share", &body).await?;
        Ok(resp.code)
    }

    pub async fn resolve_share(&self, code: &str) -> Result<SharedFileResponse, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/share/{}", code)))
            .send()
            .await?;
        decode(response).await
    }

    /// Drive a batch of files through the upload queue.
    ///
    /// The queue is mutated only between awaits on this task, so settles
    /// are applied serially even in parallel mode.
    pub async fn upload_batch(
        &self,
        uploader_id: &str,
        kind: StorageKind,
        files: &[LocalFile],
        mode: UploadMode,
        queue: &mut UploadQueue,
    ) -> Result<(), ClientError> {
        let metas: Vec<(String, u64)> = files
            .iter()
            .map(|f| (f.name.clone(), f.bytes.len() as u64))
            .collect();
        queue.add_batch(&metas)?;
        queue.enqueue_pending();

        let by_name: HashMap<&str, &LocalFile> =
            files.iter().map(|f| (f.name.as_str(), f)).collect();

        match mode {
            UploadMode::Sequential => {
                while let Some(name) = queue.next_queued().map(str::to_owned) {
                    if queue.begin(&name).is_err() {
                        // Oversize entries fail in place without a request
                        continue;
                    }
                    let Some(file) = by_name.get(name.as_str()).copied() else {
                        queue.settle_err(&name, "file contents missing");
                        continue;
                    };
                    match self.upload_one(uploader_id, kind, file).await {
                        Ok(_) => queue.settle_ok(&name),
                        Err(e) => queue.settle_err(&name, e.to_string()),
                    }
                }
            }
            UploadMode::Parallel => {
                let mut in_flight = FuturesUnordered::new();
                for name in queue.queued_names() {
                    if queue.begin(&name).is_err() {
                        continue;
                    }
                    let Some(file) = by_name.get(name.as_str()).copied() else {
                        queue.settle_err(&name, "file contents missing");
                        continue;
                    };
                    in_flight.push(async move {
                        let result = self.upload_one(uploader_id, kind, file).await;
                        (name, result)
                    });
                }
                while let Some((name, result)) = in_flight.next().await {
                    match result {
                        Ok(_) => queue.settle_ok(&name),
                        Err(e) => queue.settle_err(&name, e.to_string()),
                    }
                }
            }
        }

        Ok(())
    }

    /// Retry one failed entry. Size is not re-checked; the request is
    /// simply issued again.
    pub async fn retry_upload(
        &self,
        uploader_id: &str,
        kind: StorageKind,
        file: &LocalFile,
        queue: &mut UploadQueue,
    ) -> Result<(), ClientError> {
        if queue.retry(&file.name).is_err() {
            return Ok(());
        }
        match self.upload_one(uploader_id, kind, file).await {
            Ok(_) => queue.settle_ok(&file.name),
            Err(e) => queue.settle_err(&file.name, e.to_string()),
        }
        Ok(())
    }

    async fn upload_one(
        &self,
        uploader_id: &str,
        kind: StorageKind,
        file: &LocalFile,
    ) -> Result<String, ClientError> {
        match kind {
            StorageKind::Telegram => self.upload_telegram(uploader_id, file).await,
            StorageKind::Fast => self.upload_fast(uploader_id, file).await,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

/// Let succeeded rows linger for the display delay, then clear them.
pub async fn expire_succeeded(queue: &mut UploadQueue) {
    tokio::time::sleep(SUCCESS_DISPLAY_DELAY).await;
    queue.clear_succeeded();
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(extract_api_error(response).await);
    }
    Ok(response.json().await?)
}

/// Pull the `{"error": msg}` body out of a failure response, falling
/// back to the status line when the body is not what we expect.
async fn extract_api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    match response.json::<serde_json::Value>().await {
        Ok(body) => {
            let msg = body
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status));
            ClientError::Api(msg)
        }
        Err(_) => ClientError::Api(format!("HTTP {}", status)),
    }
}

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, multipart};
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

const API_BASE: &str = "https://api.telegram.org";

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total request timeout in seconds. Document uploads can be slow on the
/// bot backend, so this is generous.
const TOTAL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum TelegramError {
    // The bot API refuses getFile for documents over its download cap.
    #[error("File is too big for the messaging backend to serve")]
    FileTooBig,

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Bot API responses wrap every result the same way.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    document: Option<SentDocument>,
}

#[derive(Debug, Deserialize)]
struct SentDocument {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

/// Client for the messaging-bot file store.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    token: String,
    channel_id: String,
    api_base: String,
}

impl TelegramClient {
    pub fn new(config: &Config) -> Result<Self, TelegramError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            token: config.bot_token.clone(),
            channel_id: config.channel_id.clone(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Send a document to the storage channel and return the
    /// backend-assigned file identifier.
    pub async fn send_document(
        &self,
        file_name: &str,
        content: Bytes,
    ) -> Result<String, TelegramError> {
        let url = format!(
            "{}/bot{}/sendDocument?chat_id={}",
            self.api_base, self.token, self.channel_id
        );

        let part = multipart::Part::bytes(content.to_vec()).file_name(file_name.to_string());
        let form = multipart::Form::new().part("document", part);

        let response: ApiResponse<SentMessage> =
            self.http.post(&url).multipart(form).send().await?.json().await?;

        if !response.ok {
            return Err(classify_api_error(response.description));
        }

        response
            .result
            .and_then(|msg| msg.document)
            .map(|doc| doc.file_id)
            .ok_or_else(|| TelegramError::Api("sendDocument returned no document".to_string()))
    }

    /// Resolve a file identifier to an ephemeral download URL via the
    /// bot's file-info endpoint.
    pub async fn file_url(&self, file_id: &str) -> Result<String, TelegramError> {
        let url = format!(
            "{}/bot{}/getFile?file_id={}",
            self.api_base, self.token, file_id
        );

        let response: ApiResponse<FileInfo> = self.http.get(&url).send().await?.json().await?;

        if !response.ok {
            return Err(classify_api_error(response.description));
        }

        let file_path = response
            .result
            .and_then(|info| info.file_path)
            .ok_or_else(|| TelegramError::Api("getFile returned no file_path".to_string()))?;

        Ok(format!(
            "{}/file/bot{}/{}",
            self.api_base, self.token, file_path
        ))
    }
}

/// Map a bot API failure description to an error variant. The oversize
/// rejection is the one failure callers must be able to tell apart.
fn classify_api_error(description: Option<String>) -> TelegramError {
    match description {
        Some(desc) if desc.to_lowercase().contains("too big") => TelegramError::FileTooBig,
        Some(desc) => TelegramError::Api(desc),
        None => TelegramError::Api("Unknown error".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_document_response() {
        let raw = r#"{
            "ok": true,
            "result": {"message_id": 7, "document": {"file_id": "BQACAgQAAx"}}
        }"#;
        let resp: ApiResponse<SentMessage> = serde_json::from_str(raw).unwrap();
        assert!(resp.ok);
        assert_eq!(resp.result.unwrap().document.unwrap().file_id, "BQACAgQAAx");
    }

    #[test]
    fn parses_get_file_response() {
        let raw = r#"{"ok": true, "result": {"file_path": "documents/file_42.pdf"}}"#;
        let resp: ApiResponse<FileInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.result.unwrap().file_path.unwrap(), "documents/file_42.pdf");
    }

    #[test]
    fn parses_error_response_without_result() {
        let raw = r#"{"ok": false, "description": "Bad Request: file is too big"}"#;
        let resp: ApiResponse<FileInfo> = serde_json::from_str(raw).unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
    }

    #[test]
    fn oversize_rejection_is_classified_distinctly() {
        let err = classify_api_error(Some("Bad Request: file is too big".to_string()));
        assert!(matches!(err, TelegramError::FileTooBig));

        let err = classify_api_error(Some("Bad Request: chat not found".to_string()));
        assert!(matches!(err, TelegramError::Api(_)));

        let err = classify_api_error(None);
        assert!(matches!(err, TelegramError::Api(_)));
    }
}

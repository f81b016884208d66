// Submodules for local file system storage and S3 storage
mod local;
mod s3;

pub use local::LocalStorage;
pub use s3::S3Storage;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Upload Error: {0}")]
    UploadError(String),

    #[error("Delete Error: {0}")]
    DeleteError(String),
}

// Async Storage trait
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload content under the given key.
    async fn upload(&self, path: &str, content: Bytes) -> Result<(), StorageError>;

    /// Download the content stored under the given key.
    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;

    /// Delete the object stored under the given key. Deleting a missing
    /// object is not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Whether an object already occupies the given key.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

// Enum to represent storage backends
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalStorage), // Local filesystem storage
    S3(S3Storage),       // AWS S3 or MinIO storage
}

// Implement Storage trait for StorageBackend enum
// Delegates calls to the chosen backend
#[async_trait]
impl Storage for StorageBackend {
    async fn upload(&self, path: &str, content: Bytes) -> Result<(), StorageError> {
        match self {
            StorageBackend::Local(s) => s.upload(path, content).await,
            StorageBackend::S3(s) => s.upload(path, content).await,
        }
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        match self {
            StorageBackend::Local(s) => s.download(path).await,
            StorageBackend::S3(s) => s.download(path).await,
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match self {
            StorageBackend::Local(s) => s.delete(path).await,
            StorageBackend::S3(s) => s.delete(path).await,
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self {
            StorageBackend::Local(s) => s.exists(path).await,
            StorageBackend::S3(s) => s.exists(path).await,
        }
    }
}

// Initialize the storage backend based on config
pub async fn init_storage(config: &Config) -> StorageBackend {
    if config.use_s3 {
        info!("Initializing S3 storage");
        StorageBackend::S3(S3Storage::new(config).await)
    } else {
        info!("Initializing Local storage");
        StorageBackend::Local(LocalStorage::new("uploads").await)
    }
}

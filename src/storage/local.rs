use std::path::Path;
use bytes::Bytes;
use super::{Storage, StorageError};
use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

// Local filesystem storage, the development stand-in for the object store
#[derive(Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub async fn new(base_path: &str) -> Self {
        fs::create_dir_all(base_path)
            .await
            .expect("Failed to create uploads directory");
        Self {
            base_path: base_path.to_string(),
        }
    }

    /// Returns the full path of a file relative to the base directory
    fn get_full_path(&self, path: &str) -> String {
        format!("{}/{}", self.base_path, path)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, path: &str, content: Bytes) -> Result<(), StorageError> {
        let full_path = self.get_full_path(path);

        // Ensure parent directories exist (keys look like "uploader/name")
        if let Some(parent) = Path::new(&full_path).parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&content).await?;

        tracing::info!("Saved file at {:?}", full_path);

        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let full_path = self.get_full_path(path);

        if !Path::new(&full_path).exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let content = fs::read(&full_path).await.map_err(StorageError::IoError)?;

        Ok(Bytes::from(content))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.get_full_path(path);

        if Path::new(&full_path).exists() {
            fs::remove_file(&full_path)
                .await
                .map_err(StorageError::IoError)?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(Path::new(&self.get_full_path(path)).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_storage() -> (TempDir, LocalStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap()).await;
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let (_temp_dir, storage) = setup_storage().await;

        storage
            .upload("u1/notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let content = storage.download("u1/notes.txt").await.unwrap();
        assert_eq!(&content[..], b"hello");
    }

    #[tokio::test]
    async fn upload_accepts_empty_files() {
        let (_temp_dir, storage) = setup_storage().await;

        storage.upload("u1/empty.bin", Bytes::new()).await.unwrap();

        let content = storage.download("u1/empty.bin").await.unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn download_missing_key_is_not_found() {
        let (_temp_dir, storage) = setup_storage().await;

        let err = storage.download("u1/nope.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn exists_tracks_upload_and_delete() {
        let (_temp_dir, storage) = setup_storage().await;

        assert!(!storage.exists("u1/a.txt").await.unwrap());

        storage.upload("u1/a.txt", Bytes::from_static(b"x")).await.unwrap();
        assert!(storage.exists("u1/a.txt").await.unwrap());

        storage.delete("u1/a.txt").await.unwrap();
        assert!(!storage.exists("u1/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let (_temp_dir, storage) = setup_storage().await;

        storage.delete("u1/never-uploaded.txt").await.unwrap();
    }
}

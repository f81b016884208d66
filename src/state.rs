use sqlx::PgPool;
use crate::storage::StorageBackend;
use crate::telegram::TelegramClient;
use crate::config::Config;

/// Central application state shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool holding the file metadata.
    pub pool: PgPool,

    /// Object-storage backend for the "fast" storage kind.
    pub storage: StorageBackend,

    /// Bot client for the "telegram" storage kind.
    pub telegram: TelegramClient,

    /// Application configuration loaded from environment variables or `.env`.
    pub config: Config,
}

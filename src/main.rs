use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use std::net::SocketAddr;
use tracing::info;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use cloudgram::{
    config::Config,
    database::init_db,
    handlers::{
        create_share, delete_file, fast_download, fast_upload, get_file_url, list_files,
        register_upload, resolve_share,
    },
    state::AppState,
    storage::init_storage,
    telegram::TelegramClient,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()
        .expect("Failed to load configuration");

    let pool = init_db(&config.database_url)
        .await
        .expect("Failed to connect to db");

    let storage = init_storage(&config).await;

    let telegram = TelegramClient::new(&config)
        .expect("Failed to build telegram client");

    // Multipart bodies carry the file plus form fields; leave headroom
    // above the per-file ceiling.
    let body_limit = DefaultBodyLimit::max(config.max_file_size as usize + 1024 * 1024);
    let port = config.port;

    let app_state = AppState {
        pool,
        storage,
        telegram,
        config,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/upload", post(register_upload))
        .route("/api/fast/upload", post(fast_upload))
        .route("/api/files", post(list_files))
        .route("/api/delete", post(delete_file))
        .route("/api/file-url", get(get_file_url))
        .route("/api/fast/download", post(fast_download))
        .route("/api/share", post(create_share))
        .route("/api/share/{code}", get(resolve_share))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

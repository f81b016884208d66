use std::env;

use dotenvy::dotenv;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub bot_token: String,
    pub channel_id: String,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_bucket: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    #[validate(range(min = 1, max = 524288000))] // Max 500MB
    pub max_file_size: u64,
    #[validate(range(min = 1, max = 20971520))] // Bot downloads cap out at 20MB
    pub telegram_max_file_size: u64,
    #[validate(range(min = 1, max = 100))]
    pub max_batch_files: usize,
    pub use_s3: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, env::VarError> {
        // Load environment variables from `.env` file (if it exists)
        dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            bot_token: env::var("BOT_TOKEN")?,
            channel_id: env::var("CHANNEL_ID")?,
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "cloudgram".to_string()),
            s3_access_key: env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            s3_secret_key: env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            max_file_size: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| "52428800".to_string())
                .parse()
                .unwrap_or(52_428_800),
            telegram_max_file_size: env::var("TELEGRAM_MAX_FILE_SIZE")
                .unwrap_or_else(|_| "20971520".to_string())
                .parse()
                .unwrap_or(20_971_520),
            max_batch_files: env::var("MAX_BATCH_FILES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            use_s3: env::var("USE_S3")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        };

        // Validate configuration values (e.g. file size range)
        config.validate().expect("Invalid Configuration");
        Ok(config)
    }
}

//! Configuration module
//!
//! Settings are read from the environment (after loading `.env` with dotenvy)
//! into plain structs. Every numeric setting has a default; a value that fails
//! to parse falls back to that default. Required settings and cross-field rules
//! are enforced by [`Config::validate`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::FileCategory;
use crate::storage_types::StorageBackend;

const MAX_FILE_SIZE_MB: usize = 10;
const DEFAULT_CONTENT_TYPES: &str = "image/png,image/jpeg,image/webp,application/pdf";
const LOCAL_STORAGE_PATH: &str = "./storage";
const CACHE_MAX_ENTRIES: usize = 1000;
const CACHE_TTL_SECS: u64 = 300;
const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_INITIAL_DELAY_MS: u64 = 200;
const RETRY_MAX_DELAY_MS: u64 = 5_000;
const BREAKER_VOLUME_THRESHOLD: usize = 10;
const BREAKER_ERROR_THRESHOLD_PERCENTAGE: f64 = 50.0;
const BREAKER_ROLLING_WINDOW_SECS: u64 = 60;
const BREAKER_RESET_TIMEOUT_SECS: u64 = 30;
const BREAKER_CALL_TIMEOUT_SECS: u64 = 10;
const CRYPTO_MAX_CONCURRENCY: usize = 4;
const NOTIFICATION_MAX_PER_CATEGORY: usize = 100;
const RECONCILIATION_INTERVAL_SECS: u64 = 86_400;
const RECONCILIATION_BATCH_SIZE: i64 = 100;
const DIGEST_INTERVAL_SECS: u64 = 86_400;
const SMTP_PORT: u16 = 587;

/// Read an env var and parse it, falling back to `default` when unset or invalid.
fn env_or<T: FromStr + ToString>(key: &str, default: T) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Where objects live. Backends without configuration are still built, as
/// unavailable providers.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub active_backend: StorageBackend,
    pub local_storage_path: PathBuf,
    pub nas_storage_path: Option<PathBuf>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO etc.)
    pub s3_endpoint: Option<String>,
    pub gcs_bucket: Option<String>,
    pub azure_account: Option<String>,
    pub azure_container: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            active_backend: StorageBackend::Local,
            local_storage_path: PathBuf::from(LOCAL_STORAGE_PATH),
            nas_storage_path: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            gcs_bucket: None,
            azure_account: None,
            azure_container: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub categories: Vec<FileCategory>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_content_types: DEFAULT_CONTENT_TYPES
                .split(',')
                .map(str::to_string)
                .collect(),
            categories: FileCategory::defaults(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: CACHE_MAX_ENTRIES,
            ttl_secs: CACHE_TTL_SECS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            max_delay_ms: RETRY_MAX_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BreakerSettings {
    pub volume_threshold: usize,
    pub error_threshold_percentage: f64,
    pub rolling_window_secs: u64,
    pub reset_timeout_secs: u64,
    pub call_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            volume_threshold: BREAKER_VOLUME_THRESHOLD,
            error_threshold_percentage: BREAKER_ERROR_THRESHOLD_PERCENTAGE,
            rolling_window_secs: BREAKER_ROLLING_WINDOW_SECS,
            reset_timeout_secs: BREAKER_RESET_TIMEOUT_SECS,
            call_timeout_secs: BREAKER_CALL_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub max_per_category: usize,
    pub admin_emails: Vec<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_per_category: NOTIFICATION_MAX_PER_CATEGORY,
            admin_emails: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub tls: bool,
}

#[derive(Clone, Debug)]
pub struct JobsConfig {
    pub reconciliation_interval_secs: u64,
    pub reconciliation_batch_size: i64,
    pub digest_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            reconciliation_interval_secs: RECONCILIATION_INTERVAL_SECS,
            reconciliation_batch_size: RECONCILIATION_BATCH_SIZE,
            digest_interval_secs: DIGEST_INTERVAL_SECS,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,
    /// Base64-encoded 32-byte AES key.
    pub encryption_key: String,
    pub crypto_max_concurrency: usize,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub cache: CacheConfig,
    pub retry: RetrySettings,
    pub breaker: BreakerSettings,
    pub notifications: NotificationConfig,
    pub smtp: SmtpConfig,
    pub jobs: JobsConfig,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let active_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let storage = StorageConfig {
            active_backend,
            local_storage_path: PathBuf::from(
                env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| LOCAL_STORAGE_PATH.to_string()),
            ),
            nas_storage_path: env_opt("NAS_STORAGE_PATH").map(PathBuf::from),
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION").or_else(|| env_opt("AWS_REGION")),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            gcs_bucket: env_opt("GCS_BUCKET"),
            azure_account: env_opt("AZURE_ACCOUNT"),
            azure_container: env_opt("AZURE_CONTAINER"),
        };

        let categories = match env_opt("FILE_CATEGORIES") {
            Some(raw) => FileCategory::parse_list(&raw)?,
            None => FileCategory::defaults(),
        };

        let upload = UploadConfig {
            max_file_size_bytes: env_or("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB) * 1024 * 1024,
            allowed_content_types: env_list("ALLOWED_CONTENT_TYPES", DEFAULT_CONTENT_TYPES),
            categories,
        };

        let cache = CacheConfig {
            max_entries: env_or("CACHE_MAX_ENTRIES", CACHE_MAX_ENTRIES),
            ttl_secs: env_or("CACHE_TTL_SECS", CACHE_TTL_SECS),
        };

        let retry = RetrySettings {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", RETRY_MAX_ATTEMPTS),
            initial_delay_ms: env_or("RETRY_INITIAL_DELAY_MS", RETRY_INITIAL_DELAY_MS),
            max_delay_ms: env_or("RETRY_MAX_DELAY_MS", RETRY_MAX_DELAY_MS),
        };

        let breaker = BreakerSettings {
            volume_threshold: env_or("BREAKER_VOLUME_THRESHOLD", BREAKER_VOLUME_THRESHOLD),
            error_threshold_percentage: env_or(
                "BREAKER_ERROR_THRESHOLD_PERCENTAGE",
                BREAKER_ERROR_THRESHOLD_PERCENTAGE,
            ),
            rolling_window_secs: env_or("BREAKER_ROLLING_WINDOW_SECS", BREAKER_ROLLING_WINDOW_SECS),
            reset_timeout_secs: env_or("BREAKER_RESET_TIMEOUT_SECS", BREAKER_RESET_TIMEOUT_SECS),
            call_timeout_secs: env_or("BREAKER_CALL_TIMEOUT_SECS", BREAKER_CALL_TIMEOUT_SECS),
        };

        let notifications = NotificationConfig {
            max_per_category: env_or(
                "NOTIFICATION_MAX_PER_CATEGORY",
                NOTIFICATION_MAX_PER_CATEGORY,
            ),
            admin_emails: env_list("ADMIN_EMAILS", ""),
        };

        let smtp = SmtpConfig {
            enabled: env_or("EMAIL_ALERTS_ENABLED", false),
            host: env_opt("SMTP_HOST"),
            port: env_opt("SMTP_PORT").and_then(|p| p.parse().ok()).or(Some(SMTP_PORT)),
            user: env_opt("SMTP_USER"),
            password: env_opt("SMTP_PASSWORD"),
            from: env_opt("SMTP_FROM"),
            tls: env_or("SMTP_TLS", true),
        };

        let jobs = JobsConfig {
            reconciliation_interval_secs: env_or(
                "RECONCILIATION_INTERVAL_SECS",
                RECONCILIATION_INTERVAL_SECS,
            ),
            reconciliation_batch_size: env_or(
                "RECONCILIATION_BATCH_SIZE",
                RECONCILIATION_BATCH_SIZE,
            ),
            digest_interval_secs: env_or("DIGEST_INTERVAL_SECS", DIGEST_INTERVAL_SECS),
        };

        Ok(Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            encryption_key: env::var("ENCRYPTION_KEY")
                .map_err(|_| anyhow::anyhow!("ENCRYPTION_KEY must be set"))?,
            crypto_max_concurrency: env_or("CRYPTO_MAX_CONCURRENCY", CRYPTO_MAX_CONCURRENCY),
            storage,
            upload,
            cache,
            retry,
            breaker,
            notifications,
            smtp,
            jobs,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than zero"));
        }

        if self.upload.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES cannot be empty"));
        }

        if self.upload.categories.is_empty() {
            return Err(anyhow::anyhow!("FILE_CATEGORIES cannot be empty"));
        }

        if self.retry.max_attempts == 0 {
            return Err(anyhow::anyhow!("RETRY_MAX_ATTEMPTS must be at least 1"));
        }

        if !(0.0..=100.0).contains(&self.breaker.error_threshold_percentage) {
            return Err(anyhow::anyhow!(
                "BREAKER_ERROR_THRESHOLD_PERCENTAGE must be between 0 and 100"
            ));
        }

        if self.breaker.volume_threshold == 0 {
            return Err(anyhow::anyhow!("BREAKER_VOLUME_THRESHOLD must be at least 1"));
        }

        if self.crypto_max_concurrency == 0 {
            return Err(anyhow::anyhow!("CRYPTO_MAX_CONCURRENCY must be at least 1"));
        }

        if self.jobs.reconciliation_batch_size <= 0 {
            return Err(anyhow::anyhow!(
                "RECONCILIATION_BATCH_SIZE must be greater than zero"
            ));
        }

        if self.jobs.reconciliation_interval_secs == 0 || self.jobs.digest_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "RECONCILIATION_INTERVAL_SECS and DIGEST_INTERVAL_SECS must be greater than zero"
            ));
        }

        if self.smtp.enabled && (self.smtp.host.is_none() || self.smtp.from.is_none()) {
            return Err(anyhow::anyhow!(
                "EMAIL_ALERTS_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        if self.smtp.enabled && self.notifications.admin_emails.is_empty() {
            return Err(anyhow::anyhow!(
                "EMAIL_ALERTS_ENABLED=true requires ADMIN_EMAILS to be set"
            ));
        }

        crate::FileCipher::from_base64(&self.encryption_key)
            .map_err(|e| anyhow::anyhow!("ENCRYPTION_KEY is invalid: {}", e))?;

        Ok(())
    }
}

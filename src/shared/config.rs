use serde::{Deserialize, Serialize};

pub const MAX_NOTIFICATION_RETENTION_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    /// Failures an entry may accumulate before it is purged.
    pub max_retries: u32,
    /// Attempts per entry inside a single pass.
    pub attempts_per_pass: u32,
    pub retry_base_delay_ms: u64,
    pub image_batch_size: usize,
    pub aggressive_image_batch_size: usize,
    pub image_batch_pause_ms: u64,
    pub notification_retention_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub max_image_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/fieldsync.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:3000/api".to_string(),
                api_token: None,
                request_timeout_secs: 30,
            },
            sync: SyncConfig::default(),
            validation: ValidationConfig {
                max_image_bytes: 10 * 1024 * 1024, // 10MB
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: 300, // 5 minutes
            max_retries: 3,
            attempts_per_pass: 3,
            retry_base_delay_ms: 1_000,
            image_batch_size: 1,
            aggressive_image_batch_size: 5,
            image_batch_pause_ms: 500,
            notification_retention_days: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FIELDSYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_API_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_API_TOKEN") {
            cfg.remote.api_token = Some(v.trim().to_string()).filter(|token| !token.is_empty());
        }
        if let Some(value) = env_u64("FIELDSYNC_REQUEST_TIMEOUT_SECS") {
            cfg.remote.request_timeout_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("FIELDSYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("FIELDSYNC_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval = value.max(1);
        }
        if let Some(value) = env_u64("FIELDSYNC_MAX_RETRIES") {
            cfg.sync.max_retries = value.clamp(1, u32::MAX as u64) as u32;
        }
        if let Some(value) = env_u64("FIELDSYNC_RETRY_BASE_DELAY_MS") {
            cfg.sync.retry_base_delay_ms = value;
        }
        if let Some(value) = env_u64("FIELDSYNC_NOTIFICATION_RETENTION_DAYS") {
            cfg.sync.notification_retention_days =
                i64::try_from(value.max(1)).unwrap_or(i64::MAX);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        if self.sync.max_retries == 0 {
            return Err("Sync max_retries must be greater than 0".to_string());
        }
        if self.sync.attempts_per_pass == 0 {
            return Err("Sync attempts_per_pass must be greater than 0".to_string());
        }
        if self.sync.image_batch_size == 0 || self.sync.aggressive_image_batch_size == 0 {
            return Err("Image batch sizes must be greater than 0".to_string());
        }
        if self.sync.notification_retention_days <= 0 {
            return Err("Notification retention must be at least one day".to_string());
        }
        if self.sync.notification_retention_days > MAX_NOTIFICATION_RETENTION_DAYS {
            return Err(format!(
                "Notification retention must not exceed {MAX_NOTIFICATION_RETENTION_DAYS} days"
            ));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

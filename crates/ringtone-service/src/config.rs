//! Service configuration.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. Without it the service runs on the
    /// in-memory store (local development only).
    pub database_url: Option<String>,

    /// Maximum PostgreSQL pool size (default: 10).
    pub database_max_connections: u32,

    /// Directory for the persistent catalog cache (`rocksdb-backend` builds).
    pub cache_dir: Option<String>,

    /// HS256 secret used to verify bearer tokens.
    pub jwt_secret: Option<String>,

    /// Expected bearer token audience (default: "authenticated").
    pub jwt_audience: String,

    /// API key for service-to-service calls (moderation pipeline).
    pub service_api_key: Option<String>,

    /// API key for the admin withdrawal queue.
    pub admin_api_key: Option<String>,

    /// Webhook that receives payout notifications (optional).
    pub notify_webhook_url: Option<String>,

    /// Secret used to sign payout notifications (optional).
    pub notify_webhook_secret: Option<String>,

    /// Upper bound on a single notification attempt, in milliseconds.
    pub notify_timeout_ms: u64,

    /// TTL for cached catalog listings, in seconds (default: 300).
    pub listing_cache_ttl_seconds: u64,

    /// TTL for cached single-ringtone lookups, in seconds (default: 3600).
    pub item_cache_ttl_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Notification secrets file structure.
#[derive(Debug, Deserialize)]
struct NotifySecrets {
    webhook_url: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (notify_webhook_url, notify_webhook_secret) = load_notify_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL").ok(),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            cache_dir: std::env::var("CACHE_DIR").ok(),
            jwt_secret: std::env::var("JWT_SECRET").ok(),
            jwt_audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            notify_webhook_url,
            notify_webhook_secret,
            notify_timeout_ms: env_or("NOTIFY_TIMEOUT_MS", defaults.notify_timeout_ms),
            listing_cache_ttl_seconds: env_or(
                "LISTING_CACHE_TTL_SECONDS",
                defaults.listing_cache_ttl_seconds,
            ),
            item_cache_ttl_seconds: env_or("ITEM_CACHE_TTL_SECONDS", defaults.item_cache_ttl_seconds),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }

    /// Notification timeout as a `Duration`.
    #[must_use]
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    /// Listing cache TTL as a `Duration`.
    #[must_use]
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_cache_ttl_seconds)
    }

    /// Single-item cache TTL as a `Duration`.
    #[must_use]
    pub fn item_ttl(&self) -> Duration {
        Duration::from_secs(self.item_cache_ttl_seconds)
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// missing or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Load notification secrets from file or environment.
fn load_notify_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/notify.json",
        "ringtone/.secrets/notify.json",
        "../.secrets/notify.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<NotifySecrets>(path) {
            tracing::info!(path = %path, "Loaded notification secrets from file");
            return (Some(secrets.webhook_url), secrets.webhook_secret);
        }
    }

    tracing::debug!("Notification secrets file not found, using environment variables");
    (
        std::env::var("NOTIFY_WEBHOOK_URL").ok(),
        std::env::var("NOTIFY_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            cache_dir: None,
            jwt_secret: None,
            jwt_audience: "authenticated".into(),
            service_api_key: None,
            admin_api_key: None,
            notify_webhook_url: None,
            notify_webhook_secret: None,
            notify_timeout_ms: 3_000,
            listing_cache_ttl_seconds: 300,
            item_cache_ttl_seconds: 3_600,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_catalog_staleness_windows() {
        let config = ServiceConfig::default();
        assert_eq!(config.listing_ttl(), Duration::from_secs(300));
        assert_eq!(config.item_ttl(), Duration::from_secs(3_600));
        assert_eq!(config.notify_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn secrets_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"webhook_url": "https://hooks.example/payouts", "webhook_secret": "s3cret"}}"#
        )
        .unwrap();

        let secrets: NotifySecrets =
            load_secrets_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(secrets.webhook_url, "https://hooks.example/payouts");
        assert_eq!(secrets.webhook_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn missing_secrets_file_is_not_found() {
        let err = load_secrets_file::<NotifySecrets>("/nonexistent/notify.json").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}

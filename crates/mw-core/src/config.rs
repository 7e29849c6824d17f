//! Configuration types and loading

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pagination::MAX_PAGE_SIZE;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Backing file store for media and derived previews
    pub storage: StorageConfig,

    /// PDF preview derivation
    pub thumbnails: ThumbnailConfig,

    /// Listing and pagination limits
    pub widget: WidgetLimits,

    /// Load-more endpoint throttling
    pub rate_limit: RateLimitConfig,

    /// Admin settings surface
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL the widget markup and client script point at
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory that attachment file paths are relative to
    pub local_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    pub enabled: bool,
    /// Target width of the preview; height follows the aspect ratio
    pub width: u32,
    /// Suffix replacing the source extension
    pub suffix: String,
    /// Rasterizer executable (poppler's pdftoppm)
    pub rasterizer: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WidgetLimits {
    pub max_page_size: u32,
    pub store_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per client address per minute; 0 disables the limit
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Bearer token for the settings surface; `None` leaves it open
    pub token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                public_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                pool_size: 10,
            },
            storage: StorageConfig {
                local_path: "/var/lib/mediawidget/uploads".to_string(),
            },
            thumbnails: ThumbnailConfig::default(),
            widget: WidgetLimits {
                max_page_size: MAX_PAGE_SIZE,
                store_timeout_seconds: 10,
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 120,
            },
            admin: AdminConfig::default(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 200,
            suffix: "-image.png".to_string(),
            rasterizer: "pdftoppm".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ThumbnailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl WidgetLimits {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds)
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

fn parse_bool(v: &str) -> bool {
    matches!(v, "true" | "1" | "yes")
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Reject zero for settings where it would disable the feature silently
fn require_positive<T>(key: &str, value: Option<T>) -> Result<Option<T>, ConfigError>
where
    T: PartialEq + Default,
{
    match value {
        Some(v) if v == T::default() => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than 0".to_string(),
        }),
        other => Ok(other),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_var("PORT")? {
            config.server.port = port;
        }
        if let Ok(url) = std::env::var("PUBLIC_URL") {
            config.server.public_url = url.trim_end_matches('/').to_string();
        }

        // Database
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = Some(url);
        }
        if let Some(size) = parse_var("DATABASE_POOL_SIZE")? {
            config.database.pool_size = size;
        }

        // Storage
        if let Ok(path) = std::env::var("MEDIA_STORAGE_PATH") {
            config.storage.local_path = path;
        }

        // Thumbnails
        if let Ok(v) = std::env::var("THUMBNAILS_ENABLED") {
            config.thumbnails.enabled = parse_bool(&v);
        }
        if let Some(width) = require_positive("THUMBNAIL_WIDTH", parse_var("THUMBNAIL_WIDTH")?)? {
            config.thumbnails.width = width;
        }
        if let Ok(suffix) = std::env::var("THUMBNAIL_SUFFIX") {
            if !suffix.is_empty() {
                config.thumbnails.suffix = suffix;
            }
        }
        if let Ok(bin) = std::env::var("THUMBNAIL_RASTERIZER") {
            config.thumbnails.rasterizer = bin;
        }
        if let Some(secs) =
            require_positive("THUMBNAIL_TIMEOUT_SECS", parse_var("THUMBNAIL_TIMEOUT_SECS")?)?
        {
            config.thumbnails.timeout_seconds = secs;
        }

        // Widget
        if let Some(size) = parse_var::<u32>("WIDGET_MAX_PAGE_SIZE")? {
            config.widget.max_page_size = size.max(1);
        }
        if let Some(secs) =
            require_positive("WIDGET_STORE_TIMEOUT_SECS", parse_var("WIDGET_STORE_TIMEOUT_SECS")?)?
        {
            config.widget.store_timeout_seconds = secs;
        }

        // Rate limit
        if let Some(rpm) = parse_var("RATE_LIMIT_PER_MINUTE")? {
            config.rate_limit.requests_per_minute = rpm;
        }

        // Admin
        if let Ok(token) = std::env::var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Get the server address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::SocketAddr;
        let ip: std::net::IpAddr = self.server.host.parse().unwrap_or([0, 0, 0, 0].into());
        SocketAddr::new(ip, self.server.port)
    }
}

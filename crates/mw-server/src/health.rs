//! Health Check System
//!
//! Reports on the collaborators the widget depends on: the database (when
//! configured), the backing file store, and the PDF preview capability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mw_db::Database;
use mw_media::{Storage, ThumbnailDeriver};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn new(name: &str, status: HealthStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: Some(message.into()),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health checker configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Timeout for individual health checks
    pub check_timeout: Duration,
    /// Cache duration for health results
    pub cache_duration: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(10),
        }
    }
}

/// Cached health result
struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

/// Health checker service
pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    database: Option<Database>,
    storage: Arc<dyn Storage>,
    deriver: Arc<dyn ThumbnailDeriver>,
}

impl HealthChecker {
    pub fn new(
        config: HealthConfig,
        storage: Arc<dyn Storage>,
        deriver: Arc<dyn ThumbnailDeriver>,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            database: None,
            storage,
            deriver,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Get cached health or perform checks
    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedHealth {
                report: report.clone(),
                cached_at: Instant::now(),
            });
        }

        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let components = vec![
            self.check_database().await,
            self.check_storage().await,
            self.check_thumbnails(),
        ];

        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.worst(c.status));

        if status != HealthStatus::Healthy {
            warn!(status = ?status, "Health check reports problems");
        }

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();

        let Some(ref db) = self.database else {
            return ComponentHealth::new(
                "database",
                HealthStatus::Degraded,
                "Not configured, using in-memory collaborators",
                start,
            );
        };

        let (status, message) = match tokio::time::timeout(self.config.check_timeout, db.ping()).await
        {
            Ok(Ok(())) => (HealthStatus::Healthy, "Connected".to_string()),
            Ok(Err(e)) => (HealthStatus::Unhealthy, e.to_string()),
            Err(_) => (HealthStatus::Unhealthy, "Ping timed out".to_string()),
        };

        let stats = db.stats();
        ComponentHealth::new("database", status, message, start).with_details(serde_json::json!({
            "type": "postgresql",
            "pool_size": stats.size,
            "idle_connections": stats.idle,
        }))
    }

    async fn check_storage(&self) -> ComponentHealth {
        let start = Instant::now();
        let check = self.storage.exists(".health");

        let (status, message) = match tokio::time::timeout(self.config.check_timeout, check).await {
            Ok(Ok(_)) => (HealthStatus::Healthy, "Reachable".to_string()),
            Ok(Err(e)) => (HealthStatus::Unhealthy, e.to_string()),
            Err(_) => (HealthStatus::Unhealthy, "Check timed out".to_string()),
        };

        ComponentHealth::new("storage", status, message, start)
            .with_details(serde_json::json!({ "backend": self.storage.name() }))
    }

    fn check_thumbnails(&self) -> ComponentHealth {
        let start = Instant::now();
        let (status, message) = if self.deriver.is_available() {
            (HealthStatus::Healthy, "PDF previews enabled")
        } else {
            (HealthStatus::Degraded, "PDF previews unavailable")
        };

        ComponentHealth::new("thumbnails", status, message, start)
            .with_details(serde_json::json!({ "deriver": self.deriver.name() }))
    }
}

/// State shared by the health routes
pub struct HealthState {
    pub health: Arc<HealthChecker>,
}

/// Simple liveness check (Kubernetes)
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness check (Kubernetes)
pub async fn readiness(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.check().await;
    let status = report.http_status();
    (status, Json(report))
}

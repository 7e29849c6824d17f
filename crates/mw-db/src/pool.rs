//! Database connection pool management
//!
//! Provides PostgreSQL connection pooling using SQLx, plus the idempotent
//! schema bootstrap the media widget tables need.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout for connections in seconds
    pub idle_timeout_secs: u64,
}

impl PoolConfig {
    /// Create config with a specific URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 600,
        }
    }

    /// Pool settings from the application config; `None` without a URL
    pub fn from_app(config: &mw_core::config::DatabaseConfig) -> Option<Self> {
        let url = config.url.as_ref()?;
        Some(Self {
            max_connections: config.pool_size.max(1),
            min_connections: 1.min(config.pool_size),
            ..Self::with_url(url.clone())
        })
    }
}

/// Tables, created on startup when missing
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS media_categories (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS media_attachments (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        file_url TEXT NOT NULL,
        file_path TEXT NOT NULL UNIQUE,
        parent_id BIGINT REFERENCES media_attachments(id) ON DELETE CASCADE,
        metadata JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS media_attachment_categories (
        attachment_id BIGINT NOT NULL REFERENCES media_attachments(id) ON DELETE CASCADE,
        category_id BIGINT NOT NULL REFERENCES media_categories(id) ON DELETE CASCADE,
        PRIMARY KEY (attachment_id, category_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_media_attachment_categories_category \
     ON media_attachment_categories (category_id)",
    "CREATE INDEX IF NOT EXISTS idx_media_attachments_listing \
     ON media_attachments (created_at DESC, id DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS widget_settings (
        instance_id TEXT PRIMARY KEY,
        config JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &PoolConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!(
            "Database pool created with {} max connections",
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Create the widget tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!(statements = SCHEMA.len(), "Schema ensured");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

//! Widget instance settings backed by PostgreSQL

use async_trait::async_trait;
use mw_core::{InstanceId, MwResult, WidgetConfig, WidgetSettings};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::repository::{RepositoryError, RepositoryResult};

#[derive(Debug, FromRow)]
struct SettingsRow {
    instance_id: String,
    config: serde_json::Value,
}

/// Decode a stored `config` column. Fields missing from older records take
/// their defaults.
pub(crate) fn decode_config(value: serde_json::Value) -> RepositoryResult<WidgetConfig> {
    serde_json::from_value(value).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub struct PgWidgetSettings {
    pool: PgPool,
}

impl PgWidgetSettings {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WidgetSettings for PgWidgetSettings {
    async fn load(&self, instance: &str) -> MwResult<Option<WidgetConfig>> {
        let stored = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT config FROM widget_settings WHERE instance_id = $1",
        )
        .bind(instance)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(stored.map(decode_config).transpose()?)
    }

    async fn replace(&self, instance: &str, config: WidgetConfig) -> MwResult<()> {
        sqlx::query(
            r#"
            INSERT INTO widget_settings (instance_id, config, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (instance_id)
            DO UPDATE SET config = EXCLUDED.config, updated_at = NOW()
            "#,
        )
        .bind(instance)
        .bind(Json(&config))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        tracing::info!(instance, "Widget settings replaced");
        Ok(())
    }

    async fn list(&self) -> MwResult<Vec<(InstanceId, WidgetConfig)>> {
        let rows = sqlx::query_as::<_, SettingsRow>(
            "SELECT instance_id, config FROM widget_settings ORDER BY instance_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut widgets = Vec::with_capacity(rows.len());
        for row in rows {
            widgets.push((row.instance_id, decode_config(row.config)?));
        }
        Ok(widgets)
    }
}

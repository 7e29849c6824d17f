//! Derived asset registration backed by PostgreSQL
//!
//! Derived previews live in `media_attachments` next to their source, linked
//! through `parent_id`. The unique `file_path` column makes registration
//! atomic across processes.

use async_trait::async_trait;
use mw_core::Id;
use mw_media::{AssetRegistrar, MediaError, MediaResult, NewAsset, RegisteredAsset};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::repository::{RepositoryError, RepositoryResult};

/// Outcome of `INSERT … ON CONFLICT DO NOTHING` followed, on conflict, by a
/// lookup of the row that won
fn resolve_registration(
    file_path: &str,
    inserted: Option<Id>,
    existing: Option<Id>,
) -> RepositoryResult<RegisteredAsset> {
    match (inserted, existing) {
        (Some(id), _) => Ok(RegisteredAsset { id, created: true }),
        (None, Some(id)) => Ok(RegisteredAsset { id, created: false }),
        // The conflicting row was deleted between the two statements
        (None, None) => Err(RepositoryError::NotFound(format!("asset {}", file_path))),
    }
}

pub struct PgAssetRegistrar {
    pool: PgPool,
}

impl PgAssetRegistrar {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, asset: &NewAsset) -> RepositoryResult<RegisteredAsset> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO media_attachments (title, mime_type, file_url, file_path, parent_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (file_path) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&asset.title)
        .bind(&asset.mime_type)
        .bind(&asset.file_url)
        .bind(&asset.file_path)
        .bind(asset.parent_id)
        .bind(Json(&asset.metadata))
        .fetch_optional(&self.pool)
        .await?;

        let existing = match inserted {
            Some(_) => None,
            None => self.lookup(&asset.file_path).await?,
        };

        resolve_registration(&asset.file_path, inserted, existing)
    }

    async fn lookup(&self, file_path: &str) -> RepositoryResult<Option<Id>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM media_attachments WHERE file_path = $1")
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl AssetRegistrar for PgAssetRegistrar {
    async fn register_if_absent(&self, asset: NewAsset) -> MediaResult<RegisteredAsset> {
        let registered = self
            .insert(&asset)
            .await
            .map_err(|e| MediaError::Registrar(e.to_string()))?;
        tracing::debug!(
            asset_id = registered.id,
            created = registered.created,
            file_path = %asset.file_path,
            "Asset registered"
        );
        Ok(registered)
    }

    async fn find_by_path(&self, file_path: &str) -> MediaResult<Option<Id>> {
        self.lookup(file_path)
            .await
            .map_err(|e| MediaError::Registrar(e.to_string()))
    }
}

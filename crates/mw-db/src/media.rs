//! Media store backed by PostgreSQL

use async_trait::async_trait;
use mw_core::{Category, Id};
use mw_media::{AttachmentRecord, MediaResult, MediaStore};
use sqlx::{FromRow, PgPool};

use crate::repository::{to_sql_i64, RepositoryError, RepositoryResult};

/// Attachment row from database
#[derive(Debug, Clone, FromRow)]
pub struct AttachmentRow {
    pub id: i64,
    pub title: String,
    pub mime_type: String,
    pub file_url: String,
    pub file_path: String,
}

impl From<AttachmentRow> for AttachmentRecord {
    fn from(row: AttachmentRow) -> Self {
        AttachmentRecord::new(row.id, row.title, row.mime_type, row.file_url, row.file_path)
    }
}

/// Category row from database
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category::new(row.id, row.name)
    }
}

/// Attachments listed newest first; `id` breaks ties so pages never overlap
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(
        &self,
        category_id: Id,
        offset: u64,
        limit: u32,
    ) -> RepositoryResult<Vec<AttachmentRow>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT a.id, a.title, a.mime_type, a.file_url, a.file_path
            FROM media_attachments a
            JOIN media_attachment_categories c ON c.attachment_id = a.id
            WHERE c.category_id = $1
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(category_id)
        .bind(i64::from(limit))
        .bind(to_sql_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn fetch(
        &self,
        category_id: Id,
        offset: u64,
        limit: u32,
    ) -> MediaResult<Vec<AttachmentRecord>> {
        let rows = self.fetch_rows(category_id, offset, limit).await?;
        Ok(rows.into_iter().map(AttachmentRecord::from).collect())
    }

    async fn categories(&self) -> MediaResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM media_categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }
}

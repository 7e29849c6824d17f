//! Media store: attachment records filtered by category

use async_trait::async_trait;
use mw_core::{Category, Id};
use tokio::sync::RwLock;

use crate::error::MediaResult;
use crate::model::AttachmentRecord;

/// Read access to attachments and their categories.
///
/// `fetch` must return records in a stable order so that consecutive offsets
/// yield disjoint slices.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Up to `limit` attachments of a category, skipping the first `offset`
    async fn fetch(&self, category_id: Id, offset: u64, limit: u32)
        -> MediaResult<Vec<AttachmentRecord>>;

    /// All categories, ordered by name
    async fn categories(&self) -> MediaResult<Vec<Category>>;
}

struct Entry {
    record: AttachmentRecord,
    categories: Vec<Id>,
}

/// In-memory media store; records are listed in insertion order
#[derive(Default)]
pub struct MemoryMediaStore {
    entries: RwLock<Vec<Entry>>,
    categories: RwLock<Vec<Category>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_category(&self, category: Category) {
        let mut categories = self.categories.write().await;
        categories.retain(|c| c.id != category.id);
        categories.push(category);
    }

    pub async fn insert(&self, record: AttachmentRecord, categories: &[Id]) {
        let mut entries = self.entries.write().await;
        entries.push(Entry {
            record,
            categories: categories.to_vec(),
        });
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn fetch(
        &self,
        category_id: Id,
        offset: u64,
        limit: u32,
    ) -> MediaResult<Vec<AttachmentRecord>> {
        let entries = self.entries.read().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(entries
            .iter()
            .filter(|e| e.categories.contains(&category_id))
            .skip(offset)
            .take(limit as usize)
            .map(|e| e.record.clone())
            .collect())
    }

    async fn categories(&self) -> MediaResult<Vec<Category>> {
        let mut categories = self.categories.read().await.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

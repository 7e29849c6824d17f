//! Derived asset registry

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mw_core::Id;

use crate::error::MediaResult;
use crate::model::{NewAsset, RegisteredAsset};

/// Authoritative registry of derived assets.
///
/// Registration is keyed by file path and must be atomic: of any number of
/// concurrent calls for the same path, exactly one reports `created`.
#[async_trait]
pub trait AssetRegistrar: Send + Sync {
    async fn register_if_absent(&self, asset: NewAsset) -> MediaResult<RegisteredAsset>;

    /// Id of the asset registered under a file path
    async fn find_by_path(&self, file_path: &str) -> MediaResult<Option<Id>>;
}

/// In-memory registrar
pub struct MemoryAssetRegistrar {
    assets: DashMap<String, (Id, NewAsset)>,
    next_id: AtomicI64,
}

impl Default for MemoryAssetRegistrar {
    fn default() -> Self {
        Self {
            assets: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryAssetRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of registered assets, ordered by id
    pub fn assets(&self) -> Vec<(Id, NewAsset)> {
        let mut assets: Vec<_> = self.assets.iter().map(|e| e.value().clone()).collect();
        assets.sort_by_key(|(id, _)| *id);
        assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[async_trait]
impl AssetRegistrar for MemoryAssetRegistrar {
    async fn register_if_absent(&self, asset: NewAsset) -> MediaResult<RegisteredAsset> {
        match self.assets.entry(asset.file_path.clone()) {
            Entry::Occupied(existing) => Ok(RegisteredAsset {
                id: existing.get().0,
                created: false,
            }),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert((id, asset));
                Ok(RegisteredAsset { id, created: true })
            }
        }
    }

    async fn find_by_path(&self, file_path: &str) -> MediaResult<Option<Id>> {
        Ok(self.assets.get(file_path).map(|e| e.value().0))
    }
}

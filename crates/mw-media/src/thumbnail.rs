//! PDF preview derivation
//!
//! A preview is derived once per source attachment and cached on the backing
//! store under a name computed from the source path. The derived name is the
//! cache key: when the file is already there, it is returned as-is.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use image::GenericImageView;
use mw_core::config::ThumbnailConfig;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{MediaError, MediaResult};
use crate::model::{AssetMetadata, AttachmentRecord, NewAsset, RegisteredAsset, ThumbnailRecord};
use crate::rasterize::{encode_preview, PdfRasterizer, PdftoppmRasterizer};
use crate::registrar::AssetRegistrar;
use crate::storage::{calculate_digest, Storage};

/// Produces preview images for attachments
#[async_trait]
pub trait ThumbnailDeriver: Send + Sync {
    /// Preview for a record, or `None` when there is none to show.
    ///
    /// Never fails: derivation errors are logged and yield `None`.
    async fn derive(&self, record: &AttachmentRecord) -> Option<ThumbnailRecord>;

    fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Deriver used when no rasterizer is available
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopThumbnailDeriver;

#[async_trait]
impl ThumbnailDeriver for NoopThumbnailDeriver {
    async fn derive(&self, _record: &AttachmentRecord) -> Option<ThumbnailRecord> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Replace the extension of the last path segment with `suffix`.
///
/// `2024/05/report.PDF` becomes `2024/05/report-image.png`. Paths without an
/// extension get the suffix appended.
pub fn derived_name(path: &str, suffix: &str) -> String {
    let segment_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem_end = match path[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => segment_start + dot,
        _ => path.len(),
    };
    format!("{}{}", &path[..stem_end], suffix)
}

#[derive(Debug, Clone)]
pub struct DeriveOptions {
    pub width: u32,
    pub suffix: String,
    pub timeout: Duration,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self::from(&ThumbnailConfig::default())
    }
}

impl From<&ThumbnailConfig> for DeriveOptions {
    fn from(config: &ThumbnailConfig) -> Self {
        Self {
            width: config.width,
            suffix: config.suffix.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Derives first-page PNG previews of PDF attachments
pub struct PdfThumbnailDeriver {
    storage: Arc<dyn Storage>,
    registrar: Arc<dyn AssetRegistrar>,
    rasterizer: Arc<dyn PdfRasterizer>,
    options: DeriveOptions,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PdfThumbnailDeriver {
    pub fn new(
        storage: Arc<dyn Storage>,
        registrar: Arc<dyn AssetRegistrar>,
        rasterizer: Arc<dyn PdfRasterizer>,
        options: DeriveOptions,
    ) -> Self {
        Self {
            storage,
            registrar,
            rasterizer,
            options,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release(&self, key: &str) {
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn try_derive(&self, record: &AttachmentRecord) -> MediaResult<ThumbnailRecord> {
        let thumbnail = ThumbnailRecord {
            source_attachment_id: record.id,
            derived_file_url: derived_name(&record.file_url, &self.options.suffix),
            derived_file_path: derived_name(&record.file_path, &self.options.suffix),
        };

        let lock = self.lock_for(&thumbnail.derived_file_path);
        let result = {
            let _guard = lock.lock().await;
            self.derive_locked(record, &thumbnail).await
        };
        drop(lock);
        self.release(&thumbnail.derived_file_path);

        result.map(|()| thumbnail)
    }

    async fn derive_locked(
        &self,
        record: &AttachmentRecord,
        thumbnail: &ThumbnailRecord,
    ) -> MediaResult<()> {
        let key = thumbnail.derived_file_path.as_str();

        if self.storage.exists(key).await? {
            if self.registrar.find_by_path(key).await?.is_some() {
                debug!(attachment_id = record.id, key, "Preview already derived");
                return Ok(());
            }

            // Stored by an earlier attempt whose registration failed
            let stored = self.storage.get(key).await?;
            let (width, height) = image::load_from_memory(&stored)?.dimensions();
            let digest = calculate_digest(&stored);
            let registered = self
                .register(record, thumbnail, width, height, stored.len() as u64, digest)
                .await?;
            info!(
                attachment_id = record.id,
                asset_id = registered.id,
                key,
                "Registered previously stored preview"
            );
            return Ok(());
        }

        let pdf = self.storage.get(&record.file_path).await?;

        let timeout = self.options.timeout;
        let image = tokio::time::timeout(timeout, self.rasterizer.first_page(pdf, self.options.width))
            .await
            .map_err(|_| MediaError::Timeout {
                operation: "rasterize",
                seconds: timeout.as_secs(),
            })??;

        let width = self.options.width;
        let preview = tokio::task::spawn_blocking(move || encode_preview(&image, width))
            .await
            .map_err(|e| MediaError::Rasterize(e.to_string()))??;

        let stored = self.storage.put(key, preview.bytes).await?;

        let registered = self
            .register(
                record,
                thumbnail,
                preview.width,
                preview.height,
                stored.size,
                stored.digest,
            )
            .await?;

        info!(
            attachment_id = record.id,
            asset_id = registered.id,
            created = registered.created,
            key,
            "Preview derived"
        );

        Ok(())
    }

    async fn register(
        &self,
        record: &AttachmentRecord,
        thumbnail: &ThumbnailRecord,
        width: u32,
        height: u32,
        filesize: u64,
        digest: String,
    ) -> MediaResult<RegisteredAsset> {
        let key = thumbnail.derived_file_path.clone();
        self.registrar
            .register_if_absent(NewAsset {
                title: format!("{} (thumbnail)", record.title),
                mime_type: "image/png".to_string(),
                file_url: thumbnail.derived_file_url.clone(),
                file_path: key.clone(),
                parent_id: record.id,
                metadata: AssetMetadata {
                    width,
                    height,
                    filesize,
                    digest,
                    file: key,
                },
            })
            .await
    }
}

#[async_trait]
impl ThumbnailDeriver for PdfThumbnailDeriver {
    #[instrument(skip(self, record), fields(attachment_id = record.id))]
    async fn derive(&self, record: &AttachmentRecord) -> Option<ThumbnailRecord> {
        if !record.is_pdf() {
            return None;
        }

        match self.try_derive(record).await {
            Ok(thumbnail) => Some(thumbnail),
            Err(e) => {
                warn!(attachment_id = record.id, error = %e, "Preview derivation failed");
                None
            }
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.rasterizer.name()
    }
}

/// Pick the deriver for this environment.
///
/// Falls back to [`NoopThumbnailDeriver`] when previews are disabled or the
/// rasterizer cannot be run.
pub async fn build_deriver(
    config: &ThumbnailConfig,
    storage: Arc<dyn Storage>,
    registrar: Arc<dyn AssetRegistrar>,
) -> Arc<dyn ThumbnailDeriver> {
    if !config.enabled {
        info!("PDF previews disabled");
        return Arc::new(NoopThumbnailDeriver);
    }

    let rasterizer = PdftoppmRasterizer::new(config.rasterizer.clone());
    if !rasterizer.is_available().await {
        warn!(
            program = %config.rasterizer,
            "PDF rasterizer unavailable, previews disabled"
        );
        return Arc::new(NoopThumbnailDeriver);
    }

    info!(program = %config.rasterizer, width = config.width, "PDF previews enabled");
    Arc::new(PdfThumbnailDeriver::new(
        storage,
        registrar,
        Arc::new(rasterizer),
        DeriveOptions::from(config),
    ))
}

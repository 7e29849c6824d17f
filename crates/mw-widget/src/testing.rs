//! Shared fixtures for widget tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, Rgb, RgbImage};
use mw_core::Id;
use mw_media::{
    AttachmentRecord, DeriveOptions, MediaResult, MemoryAssetRegistrar, MemoryMediaStore,
    MemoryStorage, PdfRasterizer, PdfThumbnailDeriver, Storage,
};

use crate::render::MediaListRenderer;

/// Renders a blank A4-shaped page and counts calls
#[derive(Default)]
pub(crate) struct BlankPageRasterizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PdfRasterizer for BlankPageRasterizer {
    async fn first_page(&self, _pdf: Bytes, _width: u32) -> MediaResult<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            400,
            566,
            Rgb([255, 255, 255]),
        )))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "blank"
    }
}

pub(crate) struct Fixture {
    pub storage: Arc<MemoryStorage>,
    pub registrar: Arc<MemoryAssetRegistrar>,
    pub rasterizer: Arc<BlankPageRasterizer>,
    pub store: Arc<MemoryMediaStore>,
    pub renderer: MediaListRenderer,
}

impl Fixture {
    /// Add a record to the store; PDFs also get a source file in storage
    pub async fn add(&self, record: AttachmentRecord, categories: &[Id]) {
        if record.is_pdf() {
            self.storage
                .put(&record.file_path, Bytes::from_static(b"%PDF-1.4 test"))
                .await
                .unwrap();
        }
        self.store.insert(record, categories).await;
    }

    pub fn rasterizer_calls(&self) -> usize {
        self.rasterizer.calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn record(id: Id, title: &str, mime_type: &str, path: &str) -> AttachmentRecord {
    AttachmentRecord::new(id, title, mime_type, format!("/uploads/{}", path), path)
}

pub(crate) async fn fixture_with_previews() -> Fixture {
    let storage = Arc::new(MemoryStorage::new());
    let registrar = Arc::new(MemoryAssetRegistrar::new());
    let rasterizer = Arc::new(BlankPageRasterizer::default());
    let deriver = PdfThumbnailDeriver::new(
        storage.clone(),
        registrar.clone(),
        rasterizer.clone(),
        DeriveOptions::default(),
    );

    let fixture = Fixture {
        storage,
        registrar,
        rasterizer,
        store: Arc::new(MemoryMediaStore::new()),
        renderer: MediaListRenderer::new(Arc::new(deriver)),
    };

    fixture
        .storage
        .put("2024/report.pdf", Bytes::from_static(b"%PDF-1.4 test"))
        .await
        .unwrap();
    fixture
}

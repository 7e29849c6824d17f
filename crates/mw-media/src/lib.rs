//! # mw-media
//!
//! Media handling for the widget.
//!
//! ## Features
//!
//! - Attachment records and the `MediaStore` collaborator
//! - Storage abstraction for source files and derived previews
//! - Asset registration with atomic create-if-absent
//! - PDF first-page preview derivation with a no-op fallback
//!
//! ## Example
//!
//! ```rust,ignore
//! use mw_media::{
//!     DeriveOptions, MemoryAssetRegistrar, MemoryStorage, PdfThumbnailDeriver, PdftoppmRasterizer,
//!     ThumbnailDeriver,
//! };
//! use std::sync::Arc;
//!
//! let deriver = PdfThumbnailDeriver::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MemoryAssetRegistrar::new()),
//!     Arc::new(PdftoppmRasterizer::new("pdftoppm")),
//!     DeriveOptions::default(),
//! );
//!
//! if let Some(thumbnail) = deriver.derive(&record).await {
//!     println!("{}", thumbnail.derived_file_url);
//! }
//! ```

pub mod error;
pub mod model;
pub mod rasterize;
pub mod registrar;
pub mod storage;
pub mod store;
pub mod thumbnail;

pub use error::{MediaError, MediaResult};
pub use model::{
    AssetMetadata, AttachmentRecord, NewAsset, RegisteredAsset, ThumbnailRecord, PDF_MIME_TYPE,
};
pub use rasterize::{encode_preview, PdfRasterizer, PdftoppmRasterizer, PreviewImage};
pub use registrar::{AssetRegistrar, MemoryAssetRegistrar};
pub use storage::{FileMetadata, LocalStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use store::{MediaStore, MemoryMediaStore};
pub use thumbnail::{
    build_deriver, derived_name, DeriveOptions, NoopThumbnailDeriver, PdfThumbnailDeriver,
    ThumbnailDeriver,
};

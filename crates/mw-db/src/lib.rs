//! # mw-db
//!
//! PostgreSQL persistence for the media widget.
//!
//! This crate provides SQLx-backed implementations of the collaborator
//! traits, including:
//!
//! - Connection pool management and schema bootstrap
//! - `PgMediaStore` for category-filtered attachment listing
//! - `PgAssetRegistrar` for atomic derived asset registration
//! - `PgWidgetSettings` for per-instance widget configuration
//!
//! ## Example
//!
//! ```ignore
//! use mw_db::{Database, PgMediaStore, PoolConfig};
//! use mw_media::MediaStore;
//!
//! let db = Database::connect(&PoolConfig::with_url("postgres://localhost/mediawidget")).await?;
//! db.ensure_schema().await?;
//!
//! let store = PgMediaStore::new(db.pool().clone());
//! let first_page = store.fetch(3, 0, 5).await?;
//! ```

pub mod media;
pub mod pool;
pub mod registrar;
pub mod repository;
pub mod settings;

// Re-exports
pub use media::{AttachmentRow, CategoryRow, PgMediaStore};
pub use pool::{Database, PoolConfig, PoolStats};
pub use registrar::PgAssetRegistrar;
pub use repository::{RepositoryError, RepositoryResult};
pub use settings::PgWidgetSettings;

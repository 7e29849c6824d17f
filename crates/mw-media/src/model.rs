//! Attachment and derived asset records

use mw_core::Id;
use serde::{Deserialize, Serialize};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Snapshot of an attachment as returned by the media store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub id: Id,
    pub title: String,
    pub mime_type: String,
    /// Public URL of the file
    pub file_url: String,
    /// Storage key of the file, relative to the storage root
    pub file_path: String,
}

impl AttachmentRecord {
    pub fn new(
        id: Id,
        title: impl Into<String>,
        mime_type: impl Into<String>,
        file_url: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            mime_type: mime_type.into(),
            file_url: file_url.into(),
            file_path: file_path.into(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A preview derived from a source attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailRecord {
    pub source_attachment_id: Id,
    pub derived_file_url: String,
    pub derived_file_path: String,
}

/// Standard metadata stored with a registered asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub width: u32,
    pub height: u32,
    pub filesize: u64,
    /// SHA256 hex digest of the stored file
    pub digest: String,
    /// Storage key of the file
    pub file: String,
}

/// Registration request for a derived asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub title: String,
    pub mime_type: String,
    pub file_url: String,
    pub file_path: String,
    /// Source attachment the asset was derived from
    pub parent_id: Id,
    pub metadata: AssetMetadata,
}

/// Outcome of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredAsset {
    pub id: Id,
    /// `false` when an asset with the same file path already existed
    pub created: bool,
}

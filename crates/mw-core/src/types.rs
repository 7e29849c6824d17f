//! Common types used throughout the media widget

use serde::{Deserialize, Serialize};

/// Primary key type for attachments, categories, and registered assets
pub type Id = i64;

/// Identifier of a persisted widget instance
pub type InstanceId = String;

/// Taxonomy category used to filter attachments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

impl Category {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

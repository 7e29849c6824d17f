//! Core error types for the media widget

use std::collections::HashMap;
use thiserror::Error;

/// Core error type shared by the collaborators and services
#[derive(Error, Debug)]
pub enum MwError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },
}

/// Result alias for core operations
pub type MwResult<T> = Result<T, MwError>;

/// Field-level validation errors
#[derive(Error, Debug, Default, Clone)]
#[error("Validation errors: {errors:?}")]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: HashMap<String, Vec<String>>,
    /// Errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Messages sorted by field so the output is stable
    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, field_messages) in fields {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }
}

/// HTTP status code mapping for errors
impl MwError {
    pub fn status_code(&self) -> u16 {
        match self {
            MwError::NotFound { .. } => 404,
            MwError::Unauthorized { .. } => 401,
            MwError::Validation(_) => 422,
            MwError::RateLimited { .. } => 429,
            MwError::Timeout { .. } => 504,
            MwError::CapabilityUnavailable(_) => 503,
            MwError::Storage(_)
            | MwError::Database(_)
            | MwError::Internal(_)
            | MwError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            MwError::NotFound { .. } => "not_found",
            MwError::Unauthorized { .. } => "unauthorized",
            MwError::Validation(_) => "validation_failed",
            MwError::Storage(_) => "storage_error",
            MwError::Database(_) => "database_error",
            MwError::Timeout { .. } => "timeout",
            MwError::CapabilityUnavailable(_) => "capability_unavailable",
            MwError::Internal(_) => "internal_error",
            MwError::Config(_) => "configuration_error",
            MwError::RateLimited { .. } => "rate_limited",
        }
    }

    pub fn not_found(entity: &'static str, value: impl ToString) -> Self {
        MwError::NotFound {
            entity,
            field: "id",
            value: value.to_string(),
        }
    }
}

//! # mw-core
//!
//! Core types and utilities for the media widget.
//!
//! This crate provides the building blocks shared by every other crate:
//! - Common error types
//! - The `Id` alias
//! - Offset pagination types (`PageRequest`, `Page`)
//! - Widget configuration and its form mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod pagination;
pub mod types;
pub mod widget;

pub use error::*;
pub use pagination::*;
pub use types::*;
pub use widget::*;

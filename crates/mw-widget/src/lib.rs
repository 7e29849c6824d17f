//! # mw-widget
//!
//! The category-filtered media listing: HTML rendering of attachment pages,
//! PDF previews inline, and the stateless "Show More" pagination protocol.
//!
//! ```ignore
//! use mw_widget::{MediaListRenderer, PaginationController};
//!
//! let controller = PaginationController::new(store, MediaListRenderer::new(deriver), timeout);
//! let html = controller.render_widget(&config, "https://example.org").await;
//! ```

pub mod markup;
pub mod pagination;
pub mod render;

#[cfg(test)]
pub(crate) mod testing;

pub use markup::{html_escape, LoadMoreTrigger, CLIENT_SCRIPT, HAS_MORE_HEADER, LOAD_MORE_PATH, SCRIPT_PATH};
pub use pagination::{InitialView, PageFragment, PaginationController};
pub use render::MediaListRenderer;

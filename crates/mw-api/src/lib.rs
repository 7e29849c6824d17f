//! # mw-api
//!
//! HTTP surface of the media widget: the public load-more endpoint, widget
//! rendering, the client script, and the admin settings surface.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod rate_limit;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AdminAccess, ApiConfig, AppState};
pub use rate_limit::RateLimiter;
pub use routes::router;

//! Application state and axum extractors

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use mw_core::config::AppConfig;
use mw_core::WidgetSettings;
use mw_media::{MediaStore, ThumbnailDeriver};
use mw_widget::{MediaListRenderer, PaginationController};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::ApiError;
use crate::rate_limit::RateLimiter;

/// Settings the handlers read on every request
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub public_url: String,
    pub admin_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ApiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            public_url: config.server.public_url.clone(),
            admin_token: config.admin.token.clone(),
        }
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub settings: Arc<dyn WidgetSettings>,
    pub store: Arc<dyn MediaStore>,
    pub controller: Arc<PaginationController>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the collaborators together
    pub fn new(
        config: &AppConfig,
        settings: Arc<dyn WidgetSettings>,
        store: Arc<dyn MediaStore>,
        deriver: Arc<dyn ThumbnailDeriver>,
    ) -> Self {
        let controller = PaginationController::new(
            store.clone(),
            MediaListRenderer::new(deriver),
            config.widget.store_timeout(),
        )
        .with_max_page_size(config.widget.max_page_size);

        Self {
            config: Arc::new(ApiConfig::from(config)),
            settings,
            store,
            controller: Arc::new(controller),
            limiter: Arc::new(RateLimiter::per_minute(config.rate_limit.requests_per_minute)),
        }
    }
}

/// Grants access to the settings surface.
///
/// With an admin token configured the request must carry
/// `Authorization: Bearer <token>`; without one the surface is open.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let Some(expected) = app_state.config.admin_token.as_deref() else {
            return Ok(AdminAccess);
        };

        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if digest(token) == digest(expected) => Ok(AdminAccess),
            Some(_) => {
                tracing::warn!("Rejected admin request with invalid token");
                Err(ApiError::unauthorized("Invalid admin token"))
            }
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

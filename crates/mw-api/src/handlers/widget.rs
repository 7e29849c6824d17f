//! Public widget handlers

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{header, HeaderName, HeaderValue},
    response::{Html, IntoResponse, Response},
    Form,
};
use mw_core::PageRequest;
use mw_widget::{CLIENT_SCRIPT, HAS_MORE_HEADER};
use serde::Deserialize;

use super::validate_instance;
use crate::error::{ApiError, ApiResult};
use crate::extractors::AppState;

/// Fields posted by the "Show More" link
#[derive(Debug, Default, Deserialize)]
pub struct LoadMoreForm {
    pub category: Option<String>,
    pub offset: Option<String>,
    pub maxitems: Option<String>,
    /// Absent means new tab
    pub newwindow: Option<String>,
    /// Sent by the client script, ignored
    pub action: Option<String>,
}

impl LoadMoreForm {
    fn open_in_new_tab(&self) -> bool {
        self.newwindow
            .as_deref()
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(true)
    }
}

fn fragment_response(html: String, has_more: bool) -> Response {
    let flag = HeaderValue::from_static(if has_more { "true" } else { "false" });
    (
        [(HeaderName::from_static(HAS_MORE_HEADER), flag)],
        Html(html),
    )
        .into_response()
}

/// POST /mediawidget/loadmore
///
/// Always answers 200 with an HTML fragment. Anything that is not a usable
/// page request yields an empty one.
pub async fn load_more(
    State(state): State<AppState>,
    form: Result<Form<LoadMoreForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable load-more request");
            return fragment_response(String::new(), false);
        }
    };

    let Some(request) = PageRequest::parse(
        form.category.as_deref(),
        form.offset.as_deref(),
        form.maxitems.as_deref(),
        state.controller.max_page_size(),
    ) else {
        tracing::debug!(?form, "Invalid load-more parameters");
        return fragment_response(String::new(), false);
    };

    let fragment = state
        .controller
        .load_more(request, form.open_in_new_tab())
        .await;

    fragment_response(fragment.html, fragment.has_more)
}

/// GET /widgets/:instance
pub async fn show_widget(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> ApiResult<Html<String>> {
    validate_instance(&instance)?;

    let config = state
        .settings
        .load(&instance)
        .await?
        .ok_or_else(|| ApiError::not_found("widget", &instance))?;

    let html = state
        .controller
        .render_widget(&config, &state.config.public_url)
        .await;

    Ok(Html(html))
}

/// GET /mediawidget.js
pub async fn client_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        CLIENT_SCRIPT,
    )
}

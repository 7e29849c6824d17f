//! Admin settings handlers

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form, Json,
};
use mw_core::{Category, WidgetConfig, WidgetForm};
use mw_widget::markup::settings_form;
use serde::Serialize;

use super::validate_instance;
use crate::error::ApiResult;
use crate::extractors::{AdminAccess, AppState};

/// GET /widgets/:instance/settings
pub async fn edit_settings(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(instance): Path<String>,
) -> ApiResult<Html<String>> {
    validate_instance(&instance)?;

    let config = state.settings.load(&instance).await?.unwrap_or_default();
    let categories = state.store.categories().await?;

    Ok(Html(settings_form(
        &instance,
        &config.form_fields(&categories),
    )))
}

/// POST /widgets/:instance/settings
///
/// Replaces the whole record with the submitted values.
pub async fn update_settings(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(instance): Path<String>,
    Form(form): Form<WidgetForm>,
) -> ApiResult<Redirect> {
    validate_instance(&instance)?;

    let config = WidgetConfig::from_form(&form);
    tracing::info!(
        instance = %instance,
        category_id = ?config.category_id,
        page_size = config.page_size,
        "Updating widget settings"
    );
    state.settings.replace(&instance, config).await?;

    Ok(Redirect::to(&format!("/widgets/{}/settings", instance)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSummary {
    pub instance: String,
    #[serde(flatten)]
    pub config: WidgetConfig,
}

/// GET /widgets
pub async fn list_widgets(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> ApiResult<Json<Vec<WidgetSummary>>> {
    let widgets = state
        .settings
        .list()
        .await?
        .into_iter()
        .map(|(instance, config)| WidgetSummary { instance, config })
        .collect();

    Ok(Json(widgets))
}

/// GET /categories
pub async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.store.categories().await?))
}

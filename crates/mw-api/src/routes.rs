//! Widget routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use mw_widget::{LOAD_MORE_PATH, SCRIPT_PATH};

use crate::extractors::AppState;
use crate::handlers::{
    client_script, edit_settings, list_categories, list_widgets, load_more, show_widget,
    update_settings,
};
use crate::rate_limit::rate_limit;

/// Create the widget router
pub fn router(state: AppState) -> Router {
    let load_more_route = Router::new()
        .route(LOAD_MORE_PATH, post(load_more))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit,
        ));

    Router::new()
        .merge(load_more_route)
        .route(SCRIPT_PATH, get(client_script))
        .route("/widgets", get(list_widgets))
        .route("/widgets/:instance", get(show_widget))
        .route(
            "/widgets/:instance/settings",
            get(edit_settings).post(update_settings),
        )
        .route("/categories", get(list_categories))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use mw_core::config::AppConfig;
    use mw_core::{Category, MemoryWidgetSettings, WidgetConfig, WidgetSettings};
    use mw_media::{AttachmentRecord, MemoryMediaStore, NoopThumbnailDeriver};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        settings: Arc<MemoryWidgetSettings>,
    }

    async fn test_app(config: AppConfig) -> TestApp {
        let store = Arc::new(MemoryMediaStore::new());
        store.add_category(Category::new(3, "Reports")).await;
        store.add_category(Category::new(4, "Flyers")).await;
        for (id, title) in [(1, "X"), (2, "Y"), (3, "Z")] {
            store
                .insert(
                    AttachmentRecord::new(
                        id,
                        title,
                        "image/png",
                        format!("/uploads/{}.png", id),
                        format!("{}.png", id),
                    ),
                    &[3],
                )
                .await;
        }

        let settings = Arc::new(
            MemoryWidgetSettings::new()
                .with_instance("sidebar", WidgetConfig::new("Downloads", 3).with_page_size(2)),
        );

        let state = AppState::new(
            &config,
            settings.clone(),
            store,
            Arc::new(NoopThumbnailDeriver),
        );

        TestApp {
            router: router(state),
            settings,
        }
    }

    fn load_more_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mediawidget/loadmore")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 40000))))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_load_more_pages() {
        let app = test_app(AppConfig::default()).await;

        let response = app
            .router
            .clone()
            .oneshot(load_more_request(
                "action=mediawidget_loadmore&category=3&offset=0&maxitems=2",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-mediawidget-has-more"], "true");
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let html = body_string(response).await;
        assert!(html.contains(">X</a>"));
        assert!(html.contains(">Y</a>"));
        assert!(html.contains(r#"target="_blank""#));

        let response = app
            .router
            .oneshot(load_more_request("category=3&offset=2&maxitems=2&newwindow=0"))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-mediawidget-has-more"], "false");
        let html = body_string(response).await;
        assert_eq!(
            html,
            r#"<div align="center"><a href="/uploads/3.png">Z</a></div>"#
        );
    }

    #[tokio::test]
    async fn test_load_more_invalid_input_is_empty() {
        let app = test_app(AppConfig::default()).await;

        for body in [
            "category=abc&offset=0&maxitems=2",
            "category=3&offset=-1&maxitems=2",
            "category=3&offset=0&maxitems=0",
            "offset=0&maxitems=2",
            "category=3&offset=99&maxitems=2",
        ] {
            let response = app
                .router
                .clone()
                .oneshot(load_more_request(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", body);
            assert_eq!(body_string(response).await, "", "{}", body);
        }
    }

    #[tokio::test]
    async fn test_load_more_rate_limited() {
        let mut config = AppConfig::default();
        config.rate_limit.requests_per_minute = 1;
        let app = test_app(config).await;

        let first = app
            .router
            .clone()
            .oneshot(load_more_request("category=3&offset=0&maxitems=1"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .router
            .oneshot(load_more_request("category=3&offset=1&maxitems=1"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_show_widget() {
        let app = test_app(AppConfig::default()).await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/widgets/sidebar")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Downloads"));
        assert!(html.contains(r#"<div id="mediawidget-3">"#));
        assert!(html.contains(r#"data-offset="2" data-maxitems="2""#));

        let missing = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/widgets/footer")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_show_widget_trigger_uses_max_page_size() {
        let mut config = AppConfig::default();
        config.widget.max_page_size = 1;
        let app = test_app(config).await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/widgets/sidebar")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains(">X</a>"));
        assert!(!html.contains(">Y</a>"));
        assert!(html.contains(r#"data-offset="1" data-maxitems="1""#));

        let response = app
            .router
            .oneshot(load_more_request("category=3&offset=1&maxitems=1"))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-mediawidget-has-more"], "true");
        let html = body_string(response).await;
        assert!(html.contains(">Y</a>"));
        assert!(!html.contains(">Z</a>"));
    }

    #[tokio::test]
    async fn test_client_script() {
        let app = test_app(AppConfig::default()).await;

        let response = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/mediawidget.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("mediawidget-readmore"));
    }

    #[tokio::test]
    async fn test_settings_replace_whole_record() {
        let app = test_app(AppConfig::default()).await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/widgets/sidebar/settings")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("title=Flyers&category=4&maxitems="))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let saved = app.settings.load("sidebar").await.unwrap().unwrap();
        assert_eq!(saved.title, "Flyers");
        assert_eq!(saved.category_id, Some(4));
        assert_eq!(saved.page_size, 5);
        assert!(!saved.open_in_new_tab);

        let form = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/widgets/sidebar/settings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(form.status(), StatusCode::OK);
        let html = body_string(form).await;
        assert!(html.contains(r#"<option value="4" selected>Flyers</option>"#));
        assert!(!html.contains(" checked"));
    }

    #[tokio::test]
    async fn test_admin_token_required() {
        let mut config = AppConfig::default();
        config.admin.token = Some("s3cret".to_string());
        let app = test_app(config).await;

        let anonymous = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/categories")
                    .header(header::AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let admin = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/categories")
                    .header(header::AUTHORIZATION, "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(admin.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(admin).await).unwrap();
        assert_eq!(json[0]["name"], "Flyers");
        assert_eq!(json[1]["id"], 3);
    }

    #[tokio::test]
    async fn test_list_widgets() {
        let app = test_app(AppConfig::default()).await;

        let response = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/widgets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json[0]["instance"], "sidebar");
        assert_eq!(json[0]["pageSize"], 2);
    }
}

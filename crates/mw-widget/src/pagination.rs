//! Initial and load-more page protocol
//!
//! The controller keeps no state between requests. The initial render emits
//! a trigger carrying the next offset and the page size; every load-more
//! request sends them back and receives the next fragment.

use std::sync::Arc;
use std::time::Duration;

use mw_core::{Page, PageRequest, WidgetConfig, MAX_PAGE_SIZE};
use mw_media::{AttachmentRecord, MediaStore};
use tracing::{debug, error, instrument, warn};

use crate::markup::{self, LoadMoreTrigger};
use crate::render::MediaListRenderer;

/// Rendered page ready to be sent to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFragment {
    pub html: String,
    pub items: usize,
    pub has_more: bool,
    pub next_offset: u64,
}

/// First render of a widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialView {
    pub fragment: PageFragment,
    /// `None` when the widget has no category to page through
    pub trigger: Option<LoadMoreTrigger>,
}

pub struct PaginationController {
    store: Arc<dyn MediaStore>,
    renderer: MediaListRenderer,
    store_timeout: Duration,
    max_page_size: u32,
}

impl PaginationController {
    pub fn new(
        store: Arc<dyn MediaStore>,
        renderer: MediaListRenderer,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            renderer,
            store_timeout,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    /// Cap applied to every page, initial and load-more alike
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Fetch one page plus one look-ahead row. Store errors and timeouts yield an
    /// empty page.
    pub async fn fetch_page(&self, request: PageRequest) -> Page<AttachmentRecord> {
        let fetch = self
            .store
            .fetch(request.category_id, request.offset, request.fetch_limit());

        match tokio::time::timeout(self.store_timeout, fetch).await {
            Ok(Ok(rows)) => Page::from_lookahead(rows, request),
            Ok(Err(e)) => {
                error!(
                    category_id = request.category_id,
                    offset = request.offset,
                    error = %e,
                    "Media store fetch failed"
                );
                Page::empty(request)
            }
            Err(_) => {
                warn!(
                    category_id = request.category_id,
                    offset = request.offset,
                    timeout_secs = self.store_timeout.as_secs_f64(),
                    "Media store fetch timed out"
                );
                Page::empty(request)
            }
        }
    }

    /// Render the page at the requested offset
    #[instrument(skip(self), fields(category_id = request.category_id, offset = request.offset))]
    pub async fn load_more(&self, request: PageRequest, open_in_new_tab: bool) -> PageFragment {
        let request = request.clamped(self.max_page_size);
        let page = self.fetch_page(request).await;
        let html = self.renderer.render(&page.items, open_in_new_tab).await;

        debug!(items = page.len(), has_more = page.has_more, "Page rendered");

        PageFragment {
            html,
            items: page.len(),
            has_more: page.has_more,
            next_offset: request.next_offset(),
        }
    }

    /// First page of a widget and the trigger for the next one
    pub async fn initial(&self, config: &WidgetConfig) -> InitialView {
        let Some(category_id) = config.category_id else {
            return InitialView {
                fragment: PageFragment {
                    html: String::new(),
                    items: 0,
                    has_more: false,
                    next_offset: 0,
                },
                trigger: None,
            };
        };

        // The trigger advertises the clamped size so the client's offsets
        // line up with what was rendered
        let request = PageRequest::first(category_id, config.effective_page_size())
            .clamped(self.max_page_size);
        let fragment = self.load_more(request, config.open_in_new_tab).await;
        let trigger = LoadMoreTrigger {
            category_id,
            offset: fragment.next_offset,
            page_size: request.page_size,
            open_in_new_tab: config.open_in_new_tab,
            has_more: fragment.has_more,
        };

        InitialView {
            fragment,
            trigger: Some(trigger),
        }
    }

    /// Full widget markup for a configured instance
    pub async fn render_widget(&self, config: &WidgetConfig, public_url: &str) -> String {
        let view = self.initial(config).await;
        markup::widget(
            &config.title,
            config.category_id,
            &view.fragment.html,
            view.trigger.as_ref(),
            public_url,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_with_previews, record, Fixture};
    use async_trait::async_trait;
    use mw_core::{Category, Id};
    use mw_media::{MediaError, MediaResult, MemoryMediaStore, NoopThumbnailDeriver};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn controller(fixture: &Fixture) -> PaginationController {
        PaginationController::new(fixture.store.clone(), fixture.renderer.clone(), TIMEOUT)
    }

    async fn store_with(titles: &[&str], category: Id) -> Arc<MemoryMediaStore> {
        let store = Arc::new(MemoryMediaStore::new());
        for (i, title) in titles.iter().enumerate() {
            let id = i as Id + 1;
            store
                .insert(record(id, title, "image/png", &format!("{}.png", id)), &[category])
                .await;
        }
        store
    }

    fn plain(store: Arc<dyn MediaStore>) -> PaginationController {
        PaginationController::new(
            store,
            MediaListRenderer::new(Arc::new(NoopThumbnailDeriver)),
            TIMEOUT,
        )
    }

    fn titles(html: &str) -> Vec<String> {
        html.split("</a></div>")
            .filter(|s| !s.is_empty())
            .map(|s| s.rsplit('>').next().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_offsets_partition_records() {
        let store = store_with(&["X", "Y", "Z"], 1).await;
        let controller = plain(store);

        let first = controller.load_more(PageRequest::new(1, 0, 2).unwrap(), true).await;
        let second = controller.load_more(PageRequest::new(1, 2, 2).unwrap(), true).await;
        let third = controller.load_more(PageRequest::new(1, 4, 2).unwrap(), true).await;

        assert_eq!(titles(&first.html), vec!["X", "Y"]);
        assert!(first.has_more);
        assert_eq!(first.next_offset, 2);

        assert_eq!(titles(&second.html), vec!["Z"]);
        assert!(!second.has_more);

        assert_eq!(third.html, "");
        assert_eq!(third.items, 0);
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn test_concatenated_pages_reproduce_store() {
        let names: Vec<String> = (1..=13).map(|i| format!("Doc {}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let controller = plain(store_with(&refs, 4).await);

        let page_size = 3;
        let mut offset = 0;
        let mut collected = Vec::new();
        loop {
            let fragment = controller
                .load_more(PageRequest::new(4, offset, page_size).unwrap(), false)
                .await;
            if fragment.html.is_empty() {
                break;
            }
            collected.extend(titles(&fragment.html));
            offset = fragment.next_offset;
        }

        assert_eq!(collected, names);
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let controller = plain(store_with(&["A", "B"], 1).await);

        let fragment = controller.load_more(PageRequest::new(1, 2, 5).unwrap(), true).await;
        assert_eq!(fragment.html, "");

        let fragment = controller
            .load_more(PageRequest::new(1, u64::MAX, 5).unwrap(), true)
            .await;
        assert_eq!(fragment.html, "");

        let fragment = controller.load_more(PageRequest::new(99, 0, 5).unwrap(), true).await;
        assert_eq!(fragment.html, "");
    }

    #[tokio::test]
    async fn test_mixed_category_example() {
        let fixture = fixture_with_previews().await;
        fixture.add(record(1, "Cat", "image/png", "cat.png"), &[3]).await;
        fixture
            .add(record(2, "Report", "application/pdf", "2024/report.pdf"), &[3])
            .await;
        fixture
            .add(record(3, "Elsewhere", "application/pdf", "other.pdf"), &[4])
            .await;

        let config = WidgetConfig::new("Downloads", 3);
        let view = controller(&fixture).initial(&config).await;

        assert_eq!(view.fragment.items, 2);
        assert_eq!(titles(&view.fragment.html), vec!["Cat", "Report"]);
        assert!(view
            .fragment
            .html
            .contains(r#"<img src="/uploads/2024/report-image.png" alt="" /><br />Report"#));
        assert!(!view.fragment.html.contains("Elsewhere"));

        let trigger = view.trigger.unwrap();
        assert_eq!(trigger.offset, 5);
        assert_eq!(trigger.page_size, 5);
        assert!(!trigger.has_more);
    }

    #[tokio::test]
    async fn test_repeated_loads_derive_once() {
        let fixture = fixture_with_previews().await;
        fixture
            .add(record(1, "Report", "application/pdf", "2024/report.pdf"), &[3])
            .await;
        let controller = controller(&fixture);

        let request = PageRequest::first(3, 5);
        let first = controller.load_more(request, true).await;
        let second = controller.load_more(request, true).await;

        assert_eq!(first.html, second.html);
        assert_eq!(fixture.rasterizer_calls(), 1);
        assert_eq!(fixture.registrar.len(), 1);
    }

    #[tokio::test]
    async fn test_initial_without_category() {
        let controller = plain(store_with(&["A"], 1).await);
        let config = WidgetConfig {
            title: "Empty".to_string(),
            ..Default::default()
        };

        let view = controller.initial(&config).await;
        assert_eq!(view.fragment.html, "");
        assert!(view.trigger.is_none());

        let html = controller.render_widget(&config, "").await;
        assert!(html.contains(r#"<div id="mediawidget-none"></div>"#));
        assert!(!html.contains("mediawidget-readmore"));
    }

    #[tokio::test]
    async fn test_render_widget_has_trigger() {
        let controller = plain(store_with(&["A", "B", "C"], 7).await);
        let config = WidgetConfig::new("Files", 7).with_page_size(2);

        let html = controller.render_widget(&config, "https://example.org").await;

        assert!(html.contains(r#"<div id="mediawidget-7">"#));
        assert!(html.contains(r#"data-offset="2" data-maxitems="2""#));
        assert!(html.contains(r#"data-has-more="true""#));
        assert!(html.contains(r#"data-endpoint="https://example.org/mediawidget/loadmore""#));
    }

    #[tokio::test]
    async fn test_trigger_walk_respects_max_page_size() {
        let names: Vec<String> = (1..=9).map(|i| format!("Doc {}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let controller = plain(store_with(&refs, 2).await).with_max_page_size(2);
        let config = WidgetConfig::new("Files", 2).with_page_size(3);

        let view = controller.initial(&config).await;
        let mut collected = titles(&view.fragment.html);
        let mut trigger = view.trigger.unwrap();
        assert_eq!(trigger.page_size, 2);
        assert_eq!(trigger.offset, 2);

        // Follow the client: post the trigger, then advance by data-maxitems
        while trigger.has_more {
            let request = PageRequest::new(2, trigger.offset, trigger.page_size).unwrap();
            let fragment = controller.load_more(request, true).await;
            collected.extend(titles(&fragment.html));
            trigger.offset += u64::from(trigger.page_size);
            trigger.has_more = fragment.has_more;
        }

        assert_eq!(collected, names);
    }

    #[tokio::test]
    async fn test_load_more_clamps_oversized_request() {
        let controller = plain(store_with(&["A", "B", "C"], 1).await).with_max_page_size(2);

        let fragment = controller.load_more(PageRequest::new(1, 0, 50).unwrap(), true).await;

        assert_eq!(titles(&fragment.html), vec!["A", "B"]);
        assert_eq!(fragment.next_offset, 2);
        assert!(fragment.has_more);
        assert_eq!(controller.max_page_size(), 2);
    }

    struct FailingStore;

    #[async_trait]
    impl MediaStore for FailingStore {
        async fn fetch(&self, _: Id, _: u64, _: u32) -> MediaResult<Vec<AttachmentRecord>> {
            Err(MediaError::Store("connection refused".to_string()))
        }

        async fn categories(&self) -> MediaResult<Vec<Category>> {
            Ok(Vec::new())
        }
    }

    struct SlowStore;

    #[async_trait]
    impl MediaStore for SlowStore {
        async fn fetch(&self, _: Id, _: u64, _: u32) -> MediaResult<Vec<AttachmentRecord>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(vec![record(1, "Late", "image/png", "late.png")])
        }

        async fn categories(&self) -> MediaResult<Vec<Category>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let controller = plain(Arc::new(FailingStore));
        let fragment = controller.load_more(PageRequest::first(1, 5), true).await;
        assert_eq!(fragment.html, "");
        assert!(!fragment.has_more);
    }

    #[tokio::test]
    async fn test_store_timeout_degrades_to_empty() {
        let controller = PaginationController::new(
            Arc::new(SlowStore),
            MediaListRenderer::new(Arc::new(NoopThumbnailDeriver)),
            Duration::from_millis(20),
        );
        let fragment = controller.load_more(PageRequest::first(1, 5), true).await;
        assert_eq!(fragment.html, "");
    }
}

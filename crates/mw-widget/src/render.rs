//! Media list rendering

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use mw_media::{AttachmentRecord, ThumbnailDeriver};

use crate::markup::media_item;

/// Derivations running at once while rendering one page
const DERIVE_CONCURRENCY: usize = 4;

/// Renders pages of attachments as HTML fragments
#[derive(Clone)]
pub struct MediaListRenderer {
    deriver: Arc<dyn ThumbnailDeriver>,
}

impl MediaListRenderer {
    pub fn new(deriver: Arc<dyn ThumbnailDeriver>) -> Self {
        Self { deriver }
    }

    /// Render records in order. PDF entries get a preview when one can be
    /// derived; other entries are plain links.
    pub async fn render(&self, records: &[AttachmentRecord], open_in_new_tab: bool) -> String {
        let pending: Vec<_> = records
            .iter()
            .cloned()
            .map(|record| {
                let deriver = Arc::clone(&self.deriver);
                async move {
                    let preview = if record.is_pdf() {
                        deriver.derive(&record).await
                    } else {
                        None
                    };
                    media_item(
                        &record.file_url,
                        &record.title,
                        preview.as_ref().map(|t| t.derived_file_url.as_str()),
                        open_in_new_tab,
                    )
                }
            })
            .collect();

        let items: Vec<String> = stream::iter(pending)
            .buffered(DERIVE_CONCURRENCY)
            .collect()
            .await;

        items.concat()
    }
}

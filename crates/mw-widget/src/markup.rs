//! HTML building blocks
//!
//! Every function here is pure string assembly. User-provided text (titles,
//! URLs, form values) always goes through [`html_escape`].

use mw_core::{FieldKind, FormField, Id};

/// Path of the load-more endpoint, relative to the public URL
pub const LOAD_MORE_PATH: &str = "/mediawidget/loadmore";

/// Path of the client script, relative to the public URL
pub const SCRIPT_PATH: &str = "/mediawidget.js";

/// Response header telling the client whether another page exists
pub const HAS_MORE_HEADER: &str = "x-mediawidget-has-more";

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One entry of the listing
pub fn media_item(file_url: &str, title: &str, preview_url: Option<&str>, new_tab: bool) -> String {
    let target = if new_tab {
        r#" target="_blank" rel="noopener""#
    } else {
        ""
    };
    let preview = preview_url
        .map(|src| format!(r#"<img src="{}" alt="" /><br />"#, html_escape(src)))
        .unwrap_or_default();

    format!(
        r#"<div align="center"><a href="{}"{}>{}{}</a></div>"#,
        html_escape(file_url),
        target,
        preview,
        html_escape(title)
    )
}

/// State the "Show More" link carries between requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMoreTrigger {
    pub category_id: Id,
    /// Offset of the next page
    pub offset: u64,
    pub page_size: u32,
    pub open_in_new_tab: bool,
    pub has_more: bool,
}

impl LoadMoreTrigger {
    pub fn to_html(&self, endpoint: &str) -> String {
        let hidden = if self.has_more { "" } else { " hidden" };
        format!(
            concat!(
                r#"<div class="mediawidget-more" style="margin-top: 1em;text-align: center; font-size: small;"{}>"#,
                r#"<a href="javascript:void(0)" class="mediawidget-readmore" data-endpoint="{}" "#,
                r#"data-category="{}" data-offset="{}" data-maxitems="{}" data-newwindow="{}" data-has-more="{}">"#,
                "Show More</a></div>"
            ),
            hidden,
            html_escape(endpoint),
            self.category_id,
            self.offset,
            self.page_size,
            u8::from(self.open_in_new_tab),
            self.has_more
        )
    }
}

/// Complete widget: title, container with the first page, and the trigger
pub fn widget(
    title: &str,
    category_id: Option<Id>,
    fragment: &str,
    trigger: Option<&LoadMoreTrigger>,
    public_url: &str,
) -> String {
    let container_id = category_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());

    let mut html = String::from(r#"<section class="widget mediawidget">"#);
    if !title.is_empty() {
        html.push_str(&format!(
            r#"<h2 class="widget-title">{}</h2>"#,
            html_escape(title)
        ));
    }
    html.push_str(&format!(
        r#"<div id="mediawidget-{}">{}</div>"#,
        container_id, fragment
    ));
    if let Some(trigger) = trigger {
        html.push_str(&trigger.to_html(&format!("{}{}", public_url, LOAD_MORE_PATH)));
    }
    html.push_str(&format!(
        r#"<script src="{}{}" defer></script>"#,
        html_escape(public_url),
        SCRIPT_PATH
    ));
    html.push_str("</section>");
    html
}

fn field_html(instance: &str, field: &FormField) -> String {
    let id = format!("mediawidget-{}-{}", html_escape(instance), field.name);
    let input = match &field.kind {
        FieldKind::Text => format!(
            r#"<input class="widefat" id="{}" name="{}" type="text" value="{}" />"#,
            id,
            field.name,
            html_escape(&field.value)
        ),
        FieldKind::Number => format!(
            r#"<input class="widefat" id="{}" name="{}" type="number" min="1" value="{}" />"#,
            id,
            field.name,
            html_escape(&field.value)
        ),
        FieldKind::Select { options } => {
            let options: String = options
                .iter()
                .map(|o| {
                    format!(
                        r#"<option value="{}"{}>{}</option>"#,
                        html_escape(&o.value),
                        if o.selected { " selected" } else { "" },
                        html_escape(&o.label)
                    )
                })
                .collect();
            format!(
                r#"<select class="widefat" id="{}" name="{}">{}</select>"#,
                id, field.name, options
            )
        }
        FieldKind::Checkbox { checked } => format!(
            r#"<input class="widefat" id="{}" name="{}" type="checkbox" value="{}"{} />"#,
            id,
            field.name,
            html_escape(&field.value),
            if *checked { " checked" } else { "" }
        ),
    };

    format!(
        r#"<p><label for="{}">{}</label> {}</p>"#,
        id,
        html_escape(field.label),
        input
    )
}

/// Settings form for a widget instance
pub fn settings_form(instance: &str, fields: &[FormField]) -> String {
    let body: String = fields.iter().map(|f| field_html(instance, f)).collect();
    format!(
        concat!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Media Widget</title></head><body>",
            r#"<form method="post" action="/widgets/{}/settings">{}"#,
            r#"<p><button type="submit">Save</button></p></form></body></html>"#
        ),
        html_escape(instance),
        body
    )
}

/// Client script: posts to the load-more endpoint, appends the returned
/// fragment, and advances the offset
pub const CLIENT_SCRIPT: &str = r#"(function () {
  function init(link) {
    if (link.dataset.hasMore === "false") {
      link.parentNode.hidden = true;
    }
    link.addEventListener("click", function () {
      var category = link.dataset.category;
      var offset = parseInt(link.dataset.offset, 10);
      var maxitems = parseInt(link.dataset.maxitems, 10);
      link.dataset.offset = String(offset + maxitems);

      var body = new URLSearchParams({
        action: "mediawidget_loadmore",
        category: category,
        offset: String(offset),
        maxitems: String(maxitems),
        newwindow: link.dataset.newwindow || "1"
      });

      fetch(link.dataset.endpoint, { method: "POST", body: body })
        .then(function (res) {
          var more = res.headers.get("X-Mediawidget-Has-More");
          return res.text().then(function (html) { return { html: html, more: more }; });
        })
        .then(function (page) {
          var container = document.getElementById("mediawidget-" + category);
          if (container) {
            container.insertAdjacentHTML("beforeend", page.html);
          }
          if (page.more === "false") {
            link.parentNode.hidden = true;
          }
        });
    });
  }

  function ready() {
    document.querySelectorAll(".mediawidget-readmore").forEach(init);
  }

  if (document.readyState === "loading") {
    document.addEventListener("DOMContentLoaded", ready);
  } else {
    ready();
  }
})();
"#;

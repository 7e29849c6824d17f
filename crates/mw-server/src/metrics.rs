//! Metrics and Observability
//!
//! Prometheus-compatible counters for the widget endpoints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use mw_widget::LOAD_MORE_PATH;
use tracing::{debug, info_span, Instrument};

/// Metrics collector
pub struct Metrics {
    /// Total HTTP requests
    pub http_requests_total: AtomicU64,
    /// HTTP requests by status code (2xx, 3xx, 4xx, 5xx)
    pub http_requests_2xx: AtomicU64,
    pub http_requests_3xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    /// Total request duration in milliseconds
    pub http_request_duration_ms_total: AtomicU64,
    /// Requests in flight
    pub active_requests: AtomicU64,
    /// Load-more requests and the time spent on them
    pub loadmore_requests_total: AtomicU64,
    pub loadmore_duration_ms_total: AtomicU64,
    /// Widget renders
    pub widget_renders_total: AtomicU64,
    /// Requests rejected by the rate limiter
    pub rate_limited_total: AtomicU64,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_3xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_duration_ms_total: AtomicU64::new(0),
            active_requests: AtomicU64::new(0),
            loadmore_requests_total: AtomicU64::new(0),
            loadmore_duration_ms_total: AtomicU64::new(0),
            widget_renders_total: AtomicU64::new(0),
            rate_limited_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record an HTTP request
    pub fn record_request(&self, path: &str, status: StatusCode, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_ms_total
            .fetch_add(duration_ms, Ordering::Relaxed);

        let code = status.as_u16();
        let bucket = match code {
            200..=299 => &self.http_requests_2xx,
            300..=399 => &self.http_requests_3xx,
            400..=499 => &self.http_requests_4xx,
            _ => &self.http_requests_5xx,
        };
        bucket.fetch_add(1, Ordering::Relaxed);

        if status == StatusCode::TOO_MANY_REQUESTS {
            self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
        }

        if path == LOAD_MORE_PATH {
            self.loadmore_requests_total.fetch_add(1, Ordering::Relaxed);
            self.loadmore_duration_ms_total
                .fetch_add(duration_ms, Ordering::Relaxed);
        } else if is_widget_path(path) && status.is_success() {
            self.widget_renders_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        let counter = |out: &mut String, name: &str, help: &str, value: u64| {
            out.push_str(&format!("# HELP {} {}\n", name, help));
            out.push_str(&format!("# TYPE {} counter\n", name));
            out.push_str(&format!("{} {}\n", name, value));
        };

        counter(
            &mut output,
            "http_requests_total",
            "Total number of HTTP requests",
            self.http_requests_total.load(Ordering::Relaxed),
        );

        output.push_str("# HELP http_requests_by_status HTTP requests by status code range\n");
        output.push_str("# TYPE http_requests_by_status counter\n");
        for (range, value) in [
            ("2xx", &self.http_requests_2xx),
            ("3xx", &self.http_requests_3xx),
            ("4xx", &self.http_requests_4xx),
            ("5xx", &self.http_requests_5xx),
        ] {
            output.push_str(&format!(
                "http_requests_by_status{{status=\"{}\"}} {}\n",
                range,
                value.load(Ordering::Relaxed)
            ));
        }

        counter(
            &mut output,
            "http_request_duration_ms_total",
            "Total HTTP request duration in milliseconds",
            self.http_request_duration_ms_total.load(Ordering::Relaxed),
        );

        output.push_str("# HELP active_requests Requests currently in flight\n");
        output.push_str("# TYPE active_requests gauge\n");
        output.push_str(&format!(
            "active_requests {}\n",
            self.active_requests.load(Ordering::Relaxed)
        ));

        counter(
            &mut output,
            "mediawidget_loadmore_requests_total",
            "Load-more requests served",
            self.loadmore_requests_total.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "mediawidget_loadmore_duration_ms_total",
            "Total load-more duration in milliseconds",
            self.loadmore_duration_ms_total.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "mediawidget_widget_renders_total",
            "Widgets rendered",
            self.widget_renders_total.load(Ordering::Relaxed),
        );
        counter(
            &mut output,
            "mediawidget_rate_limited_total",
            "Requests rejected by the rate limiter",
            self.rate_limited_total.load(Ordering::Relaxed),
        );

        output.push_str("# HELP uptime_seconds Server uptime in seconds\n");
        output.push_str("# TYPE uptime_seconds gauge\n");
        output.push_str(&format!("uptime_seconds {}\n", self.uptime_seconds()));

        output
    }

    /// Export metrics as JSON
    pub fn export_json(&self) -> serde_json::Value {
        serde_json::json!({
            "http": {
                "requests_total": self.http_requests_total.load(Ordering::Relaxed),
                "requests_2xx": self.http_requests_2xx.load(Ordering::Relaxed),
                "requests_3xx": self.http_requests_3xx.load(Ordering::Relaxed),
                "requests_4xx": self.http_requests_4xx.load(Ordering::Relaxed),
                "requests_5xx": self.http_requests_5xx.load(Ordering::Relaxed),
                "request_duration_ms_total": self.http_request_duration_ms_total.load(Ordering::Relaxed),
                "active_requests": self.active_requests.load(Ordering::Relaxed),
            },
            "widget": {
                "loadmore_requests": self.loadmore_requests_total.load(Ordering::Relaxed),
                "loadmore_duration_ms_total": self.loadmore_duration_ms_total.load(Ordering::Relaxed),
                "renders": self.widget_renders_total.load(Ordering::Relaxed),
                "rate_limited": self.rate_limited_total.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
    }
}

/// `/widgets/:instance`, not the settings pages
fn is_widget_path(path: &str) -> bool {
    path.strip_prefix("/widgets/")
        .map(|rest| !rest.is_empty() && !rest.contains('/'))
        .unwrap_or(false)
}

/// Metrics middleware
pub async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    metrics.active_requests.fetch_add(1, Ordering::Relaxed);

    let response = next
        .run(request)
        .instrument(info_span!("http_request", %method, %uri))
        .await;

    let duration = start.elapsed();
    let status = response.status();

    debug!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    metrics.record_request(&uri, status, duration.as_millis() as u64);
    metrics.active_requests.fetch_sub(1, Ordering::Relaxed);

    response
}

/// Handler for /metrics endpoint (Prometheus format)
pub async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.export_prometheus()
}

/// Handler for /metrics.json endpoint
pub async fn json_metrics(State(metrics): State<Arc<Metrics>>) -> axum::Json<serde_json::Value> {
    axum::Json(metrics.export_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new();

        metrics.record_request("/mediawidget/loadmore", StatusCode::OK, 50);
        metrics.record_request("/widgets/sidebar", StatusCode::NOT_FOUND, 10);
        metrics.record_request("/widgets/sidebar", StatusCode::OK, 5);
        metrics.record_request("/health", StatusCode::SERVICE_UNAVAILABLE, 100);

        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.http_requests_2xx.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_5xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.loadmore_requests_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.widget_renders_total.load(Ordering::Relaxed), 1);
        assert_eq!(
            metrics.http_request_duration_ms_total.load(Ordering::Relaxed),
            165
        );
    }

    #[test]
    fn test_rate_limited_counter() {
        let metrics = Metrics::new();
        metrics.record_request("/mediawidget/loadmore", StatusCode::TOO_MANY_REQUESTS, 1);

        assert_eq!(metrics.rate_limited_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_is_widget_path() {
        assert!(is_widget_path("/widgets/sidebar"));
        assert!(!is_widget_path("/widgets/sidebar/settings"));
        assert!(!is_widget_path("/widgets/"));
        assert!(!is_widget_path("/categories"));
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_request("/mediawidget/loadmore", StatusCode::OK, 50);

        let output = metrics.export_prometheus();
        assert!(output.contains("http_requests_total 1"));
        assert!(output.contains("mediawidget_loadmore_requests_total 1"));
        assert!(output.contains("http_requests_by_status{status=\"2xx\"} 1"));
        assert!(output.contains("uptime_seconds"));
    }

    #[test]
    fn test_json_export() {
        let metrics = Metrics::new();
        metrics.record_request("/widgets/footer", StatusCode::OK, 5);

        let json = metrics.export_json();
        assert_eq!(json["http"]["requests_total"], 1);
        assert_eq!(json["widget"]["renders"], 1);
    }
}

//! Access log: one colored line per completed request.
//!
//! Format: `METHOD STATUS CONTENT-LENGTH - RESPONSE-TIME ms`. The path is
//! left out; the response interceptor logs it when verbose.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Per-instance access logger state.
#[derive(Debug, Clone)]
pub struct AccessLogger {
    instance: Arc<str>,
    ansi: bool,
}

impl AccessLogger {
    pub fn new(instance: &str, ansi: bool) -> Self {
        Self {
            instance: Arc::from(instance),
            ansi,
        }
    }

    /// Build the line for a finished request.
    pub fn format_line(
        &self,
        method: &str,
        status: u16,
        content_length: Option<&str>,
        elapsed: Duration,
    ) -> String {
        let line = format!(
            "{} {} {} - {:.3} ms",
            method,
            status,
            content_length.unwrap_or("-"),
            elapsed.as_secs_f64() * 1000.0
        );
        if !self.ansi {
            return line;
        }
        let color = if status < 400 { GREEN } else { RED };
        format!("{color}{line}{RESET}")
    }
}

/// Middleware writing the access line once the response is ready.
pub async fn access_log(
    State(logger): State<AccessLogger>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok());
    let line = logger.format_line(&method, status, content_length, start.elapsed());
    tracing::info!(target: "access", instance = %logger.instance, "{}", line);

    metrics::record_request(&logger.instance, &method, status, start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::capture::capture;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn logged_app() -> Router {
        Router::new()
            .route("/hello", get(|| async { "hello" }))
            .layer(middleware::from_fn_with_state(
                AccessLogger::new("FULL-NODE", false),
                access_log,
            ))
    }

    #[tokio::test]
    async fn test_middleware_writes_one_line_per_request() {
        let (logs, _guard) = capture();

        let response = logged_app()
            .oneshot(axum::http::Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let contents = logs.contents();
        let lines: Vec<&str> = contents.lines().filter(|l| l.contains(" ms")).collect();
        assert_eq!(lines.len(), 1, "{contents}");
        assert!(lines[0].contains("GET 200 5 - "), "{contents}");
        assert!(lines[0].contains("instance=FULL-NODE"), "{contents}");
        assert!(!lines[0].contains("/hello"), "{contents}");
    }

    #[tokio::test]
    async fn test_middleware_logs_failure_status() {
        let (logs, _guard) = capture();

        let response = logged_app()
            .oneshot(axum::http::Request::post("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let contents = logs.contents();
        assert_eq!(contents.matches(" ms").count(), 1, "{contents}");
        assert!(contents.contains("POST 404 "), "{contents}");
    }

    #[test]
    fn test_plain_line() {
        let logger = AccessLogger::new("FULL-NODE", false);
        let line = logger.format_line("POST", 200, Some("11"), Duration::from_micros(3_250));
        assert_eq!(line, "POST 200 11 - 3.250 ms");
    }

    #[test]
    fn test_missing_length_prints_dash() {
        let logger = AccessLogger::new("FULL-NODE", false);
        let line = logger.format_line("GET", 500, None, Duration::ZERO);
        assert_eq!(line, "GET 500 - - 0.000 ms");
    }

    #[test]
    fn test_status_colors() {
        let logger = AccessLogger::new("FULL-NODE", true);

        let ok = logger.format_line("GET", 399, Some("0"), Duration::ZERO);
        assert!(ok.starts_with(GREEN) && ok.ends_with(RESET));

        let failed = logger.format_line("GET", 400, Some("0"), Duration::ZERO);
        assert!(failed.starts_with(RED) && failed.ends_with(RESET));
    }
}

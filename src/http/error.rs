//! Error taxonomy for the request pipeline and its translation into responses.
//!
//! Every failure is contained at the request boundary: the handler turns it
//! into exactly one `text/plain` response and the listener keeps serving.

use std::any::Any;
use std::error::Error as StdError;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use thiserror::Error;

/// Message sent in place of the detail when detail exposure is disabled.
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Upstream request failed";

/// Errors raised while serving.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("{}", error_chain(.0))]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl ProxyError {
    /// Status code the client sees for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidJson(_) | ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Converts pipeline failures into the fixed-shape client response.
#[derive(Debug, Clone, Copy)]
pub struct ErrorTranslator {
    expose_detail: bool,
}

impl ErrorTranslator {
    pub fn new(expose_detail: bool) -> Self {
        Self { expose_detail }
    }

    /// Build the response for `err`. Upstream failures are `500`; request
    /// problems keep their own status.
    pub fn respond(&self, who: &str, err: &ProxyError) -> Response {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(who, error = %err, "Upstream error");
        } else {
            tracing::warn!(who, error = %err, status = status.as_u16(), "Rejected request");
        }

        let body = match err {
            ProxyError::Upstream(_) if !self.expose_detail => GENERIC_UPSTREAM_MESSAGE.to_string(),
            _ => err.to_string(),
        };
        plain_text(status, body)
    }
}

/// Response for a panic caught at the request boundary.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic_message = %detail, "Request handler panicked");
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal proxy error")
}

/// A response with exactly `Content-Type: text/plain`.
pub fn plain_text(status: StatusCode, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(error_chain(&err), "outer: connection refused");
    }

    #[tokio::test]
    async fn test_body_too_large_is_413() {
        let translator = ErrorTranslator::new(true);
        let response = translator.respond("T", &ProxyError::BodyTooLarge { limit: 10 });

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"request body exceeds 10 bytes");
    }

    #[tokio::test]
    async fn test_invalid_json_is_400() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let response = ErrorTranslator::new(false).respond("T", &ProxyError::InvalidJson(err));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"invalid JSON body:"));
    }

    #[tokio::test]
    async fn test_panic_response_shape() {
        let response = panic_response(Box::new("boom"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal proxy error");
    }
}

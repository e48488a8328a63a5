//! Response handling and transformation.
//!
//! # Responsibilities
//! - Inject the fixed CORS headers into every proxied response
//! - Strip hop-by-hop headers sent by the backend
//! - Tee the streamed body into a buffer when verbose, logging it at end of stream
//!
//! # Design Decisions
//! - The tee is a body wrapper: frames are forwarded as they arrive, in order
//! - Nothing is logged for a stream that fails or is dropped early

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{header::HeaderMap, HeaderName, HeaderValue},
    response::Response,
    BoxError,
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};

use crate::config::VerbosityConfig;
use crate::http::request::strip_hop_by_hop;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "X-Requested-With,Content-Type,Accept";
pub const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

/// Overwrite the CORS headers, whatever the backend sent.
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static(ALLOW_METHODS),
    );
}

/// Per-response hook, tagged with the instance name.
pub struct ResponseInterceptor<'a> {
    who: &'a str,
    verbosity: &'a VerbosityConfig,
}

impl<'a> ResponseInterceptor<'a> {
    pub fn new(who: &'a str, verbosity: &'a VerbosityConfig) -> Self {
        Self { who, verbosity }
    }

    /// Add CORS headers and, when verbose, wrap the body in a logging tee.
    pub fn intercept<B>(&self, path: &str, response: Response<B>) -> Response<Body>
    where
        B: HttpBody<Data = Bytes> + Send + Unpin + 'static,
        B::Error: Into<BoxError>,
    {
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        apply_cors_headers(&mut parts.headers);

        if !self.verbosity.verbose {
            return Response::from_parts(parts, Body::new(body));
        }

        let who = self.who.to_string();
        let path = path.to_string();
        let format_json = self.verbosity.format_json;
        let body = LoggingBody::new(
            body,
            Box::new(move |bytes: Bytes| {
                let output = render_output(&bytes, format_json);
                tracing::info!(who = %who, path = %path, "[Output]\n{}", output);
            }),
        );
        Response::from_parts(parts, Body::new(body))
    }
}

/// Called once with the whole body when the stream completes.
pub type CompletionHook = Box<dyn FnOnce(Bytes) + Send>;

/// Body wrapper that forwards every frame and keeps a copy of the data.
pub struct LoggingBody<B> {
    inner: B,
    buffer: Vec<u8>,
    on_complete: Option<CompletionHook>,
}

impl<B> LoggingBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
{
    pub fn new(inner: B, on_complete: CompletionHook) -> Self {
        let mut body = Self {
            inner,
            buffer: Vec::new(),
            on_complete: Some(on_complete),
        };
        // An already-finished body is never polled.
        if body.inner.is_end_stream() {
            body.finish();
        }
        body
    }

    fn finish(&mut self) {
        if let Some(hook) = self.on_complete.take() {
            hook(Bytes::from(std::mem::take(&mut self.buffer)));
        }
    }
}

impl<B> HttpBody for LoggingBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.extend_from_slice(data);
                }
                if this.inner.is_end_stream() {
                    this.finish();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.on_complete = None;
                Poll::Ready(Some(Err(e.into())))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Text for the `[Output]` log: trailing newlines stripped, JSON pretty-printed
/// on request. Bodies that are not JSON are logged as-is.
pub fn render_output(body: &[u8], format_json: bool) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim_end_matches('\n');
    if !format_json {
        return text.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Response body is not JSON; logging raw text");
            text.to_string()
        }
    }
}

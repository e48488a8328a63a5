//! Outbound request transformation.
//!
//! # Responsibilities
//! - Point the request at the instance's backend (origin change)
//! - Strip hop-by-hop headers
//! - Log query string and POST body when verbosity asks for it
//! - Re-serialize POST bodies as JSON with an exact `Content-Length`
//!
//! # Design Decisions
//! - Only POST bodies are buffered; every other body streams through
//! - A POST body without a JSON content type is treated as `{}`
//! - Object key order survives re-serialization

use axum::{
    body::{Body, Bytes},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        uri::{Authority, Scheme},
        Method, Request, Uri, Version,
    },
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::VerbosityConfig;
use crate::http::error::ProxyError;
use crate::observability::logging::render_json;

/// Headers meaningful only for a single transport hop.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Per-request hook run immediately before the request goes to the backend.
pub struct RequestInterceptor<'a> {
    verbosity: &'a VerbosityConfig,
    max_body_bytes: usize,
}

impl<'a> RequestInterceptor<'a> {
    pub fn new(verbosity: &'a VerbosityConfig, max_body_bytes: usize) -> Self {
        Self {
            verbosity,
            max_body_bytes,
        }
    }

    /// Turn the inbound request into the one sent to `target`.
    pub async fn prepare(
        &self,
        request: Request<Body>,
        target: &Authority,
    ) -> Result<Request<Body>, ProxyError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = backend_uri(&parts.uri, target)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.insert(
            header::HOST,
            HeaderValue::from_str(target.as_str()).map_err(axum::http::Error::from)?,
        );

        let query = query_to_json(parts.uri.query());
        if self.verbosity.verbose && self.verbosity.show_query_string && !query.is_empty() {
            let rendered = render_json(&Value::Object(query), self.verbosity.format_json);
            tracing::info!("[QueryString] {}", rendered);
        }

        if parts.method != Method::POST {
            return Ok(Request::from_parts(parts, body));
        }

        let raw = read_limited(body, self.max_body_bytes).await?;
        let parsed = parse_body(&parts.headers, &raw)?;

        if self.verbosity.verbose && self.verbosity.show_body && has_entries(&parsed) {
            let rendered = render_json(&parsed, self.verbosity.format_json);
            tracing::info!("[PostBody] {}", rendered);
        }

        let payload = Bytes::from(serde_json::to_vec(&parsed)?);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));

        Ok(Request::from_parts(parts, Body::from(payload)))
    }
}

/// `http://<target><path>?<query>`, path and query untouched.
pub fn backend_uri(uri: &Uri, target: &Authority) -> Result<Uri, ProxyError> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Ok(Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(target.clone())
        .path_and_query(path_and_query)
        .build()?)
}

/// Remove hop-by-hop headers, including any the `Connection` header names.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Decode a query string into a JSON object. Repeated keys become arrays.
pub fn query_to_json(query: Option<&str>) -> Map<String, Value> {
    let mut map = Map::new();
    let Some(query) = query else { return map };

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    map
}

/// True for `application/json` and `application/*+json`.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Parse a POST body. Empty or non-JSON bodies become `{}`; a JSON body must
/// be an object or an array.
pub fn parse_body(headers: &HeaderMap, raw: &[u8]) -> Result<Value, ProxyError> {
    if !is_json_content_type(headers) || raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_slice(raw)? {
        value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
        _ => Err(ProxyError::InvalidJson(serde::de::Error::custom(
            "top-level value must be an object or an array",
        ))),
    }
}

fn has_entries(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

async fn read_limited(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ProxyError::BodyTooLarge { limit }),
        Err(e) => Err(ProxyError::BodyRead(e.to_string())),
    }
}

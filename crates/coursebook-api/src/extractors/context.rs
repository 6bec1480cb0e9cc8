//! Request context extractor.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use coursebook_service::RequestContext;

/// Header carrying the request id, set by the request-id layer.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying a caller-supplied trace id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// W3C trace context header; its trace-id field is used when present.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Builds a [`RequestContext`] from the request headers.
#[derive(Debug, Clone)]
pub struct RequestCtx(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for RequestCtx {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(context_from_headers(&parts.headers)))
    }
}

fn context_from_headers(headers: &HeaderMap) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let trace_id = header(TRACE_ID_HEADER)
        .map(str::to_string)
        .or_else(|| header(TRACEPARENT_HEADER).and_then(trace_id_from_traceparent));

    match header(REQUEST_ID_HEADER) {
        Some(request_id) => RequestContext::new(request_id, trace_id),
        None => RequestContext {
            trace_id,
            ..RequestContext::default()
        },
    }
}

/// `version-traceid-parentid-flags`
fn trace_id_from_traceparent(value: &str) -> Option<String> {
    let mut parts = value.split('-');
    let _version = parts.next()?;
    let trace_id = parts.next()?;
    (trace_id.len() == 32 && trace_id.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| trace_id.to_string())
}

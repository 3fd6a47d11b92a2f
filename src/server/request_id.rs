//! Request correlation.
//!
//! Every request gets an id: the caller's `x-request-id` header when one is
//! present, a fresh UUID otherwise. The id rides in a tracing span for the
//! request's lifetime, is available to handlers through request extensions,
//! and is echoed in the response header and error bodies so a caller can
//! quote it when reporting a failure.

use std::fmt;

use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest caller-supplied id we adopt as-is.
const MAX_ID_LEN: usize = 64;

/// Correlation id carried in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl RequestId {
    fn from_headers(request: &Request<axum::body::Body>) -> Self {
        let id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| acceptable_id(v))
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self(id)
    }
}

/// Caller-supplied ids ride through the tracing span, the response header,
/// and error bodies, so only short printable-ASCII values are adopted;
/// anything else is replaced with a fresh UUID.
fn acceptable_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && id.chars().all(|c| c.is_ascii_graphic())
}

pub async fn request_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let id = RequestId::from_headers(&request);
    request.extensions_mut().insert(id.clone());

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.0) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

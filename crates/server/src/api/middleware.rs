//! HTTP middleware implementations

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use types::utils::generate_correlation_id;

/// Header carrying the request trace identifier in both directions
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Older clients send this instead of [`TRACE_ID_HEADER`]; echoed too
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const REQUEST_PRIVATE_NETWORK_HEADER: &str = "access-control-request-private-network";
pub const ALLOW_PRIVATE_NETWORK_HEADER: &str = "access-control-allow-private-network";

const MAX_INCOMING_ID_LEN: usize = 128;

/// Per-request trace identifier, available to handlers as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn incoming_id<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= MAX_INCOMING_ID_LEN)
}

/// Attach a trace id to every request and echo it on the response
///
/// A well-formed incoming `x-trace-id` is reused, then `x-request-id`;
/// otherwise a UUID v4 is generated. The id goes back under both headers.
pub async fn trace_id(mut request: Request, next: Next) -> Response {
    let id = incoming_id(request.headers(), TRACE_ID_HEADER)
        .or_else(|| incoming_id(request.headers(), REQUEST_ID_HEADER))
        .map(str::to_owned)
        .unwrap_or_else(generate_correlation_id);

    request.extensions_mut().insert(TraceId(id.clone()));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        let headers = response.headers_mut();
        headers.insert(HeaderName::from_static(TRACE_ID_HEADER), value.clone());
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Answer Private Network Access preflights
///
/// Browsers on a public or HTTPS origin ask before calling a device on the
/// local network; the device must opt in on the `OPTIONS` response.
pub async fn private_network_access(request: Request, next: Next) -> Response {
    let wants_private_network = request.method() == Method::OPTIONS
        && request
            .headers()
            .get(REQUEST_PRIVATE_NETWORK_HEADER)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| value.trim().eq_ignore_ascii_case("true"));

    let mut response = next.run(request).await;
    if wants_private_network {
        response.headers_mut().insert(
            HeaderName::from_static(ALLOW_PRIVATE_NETWORK_HEADER),
            HeaderValue::from_static("true"),
        );
    }
    response
}

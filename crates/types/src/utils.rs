//! Utility functions and helpers

use url::Url;

/// Generate a correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Check that `origin` is a bare web origin: `scheme://host[:port]`
///
/// Only `http` and `https` are accepted. Paths, queries, fragments and
/// credentials are rejected, as is a trailing slash.
pub fn check_origin(origin: &str) -> Result<(), String> {
    normalize_origin(origin).map(|_| ())
}

/// Validate `origin` and return its canonical ASCII form
///
/// The input must spell out exactly the origin the URL parser derives from
/// it, ignoring case. Anything the parser would silently drop or rewrite
/// (dot segments, backslashes, a default port, percent escapes) is refused.
pub fn normalize_origin(origin: &str) -> Result<String, String> {
    if origin.is_empty() {
        return Err("origin cannot be empty".to_string());
    }
    if origin.trim() != origin {
        return Err(format!("origin '{}' has surrounding whitespace", origin));
    }

    let url = Url::parse(origin).map_err(|e| format!("origin '{}' is not a valid URL: {}", origin, e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("origin '{}' must use http or https", origin));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("origin '{}' must include a host", origin));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(format!("origin '{}' must not contain credentials", origin));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("origin '{}' must not contain a query or fragment", origin));
    }

    let canonical = url.origin().ascii_serialization();
    if !canonical.eq_ignore_ascii_case(origin) {
        return Err(format!(
            "origin '{}' must be exactly scheme://host[:port] (did you mean '{}'?)",
            origin, canonical
        ));
    }

    Ok(canonical)
}

pub fn is_valid_origin(origin: &str) -> bool {
    check_origin(origin).is_ok()
}

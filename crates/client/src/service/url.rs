//! Endpoint URL construction for entity URIs.

/// Error type for endpoint URL failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid entity URI: {0}")]
    InvalidUri(String),
}

/// Normalize the service base URL so entity URIs can be joined onto it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http(s) scheme
/// 3. Lowercase the host
/// 4. Drop query and fragment
/// 5. Ensure the path ends with `/`
pub fn normalize_base(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_query(None);
    parsed.set_fragment(None);

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Resolve an entity URI (`repo` or `repo/dataset`) against the base URL.
pub fn endpoint(base: &url::Url, uri: &str) -> Result<url::Url, UrlError> {
    let relative = uri.trim_start_matches('/');
    if relative.contains("://") || relative.contains('?') || relative.contains('#') {
        return Err(UrlError::InvalidUri(uri.to_string()));
    }
    if relative.split('/').any(|segment| segment == "..") {
        return Err(UrlError::InvalidUri(uri.to_string()));
    }
    base.join(relative).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

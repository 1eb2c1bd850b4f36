//! Cache key derivation.

use bridge_traits::http::{HttpMethod, HttpRequest};
use std::fmt;
use url::Url;

/// Identity of a cached response: method, normalized URL and serialized
/// query parameters. Request bodies never contribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: HttpMethod,
    url: String,
    params: String,
}

impl CacheKey {
    pub fn new(method: HttpMethod, url: &str, params: &[(String, String)]) -> Self {
        Self {
            method,
            url: normalize_url(url),
            params: serialize_params(params),
        }
    }

    pub fn for_request(request: &HttpRequest) -> Self {
        Self::new(request.method, &request.url, &request.query)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Normalized absolute URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether this key belongs to `prefix` for manual invalidation.
    ///
    /// Matches on substring of the rendered key, so both a full URL prefix and
    /// a path fragment such as `/youtube/related/` select entries.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.to_string().contains(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}?{}", self.method, self.url, self.params)
    }
}

/// Parse and re-serialize so that host case, default ports and empty paths
/// collapse to one spelling. Unparseable input is kept verbatim.
fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

fn serialize_params(params: &[(String, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    serde_json::to_string(params).unwrap_or_else(|_| format!("{:?}", params))
}

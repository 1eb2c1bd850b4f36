//! Freshness directives parsed from response headers.

use bridge_traits::http::{HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// What a response's headers say about storing and reusing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Freshness {
    /// `Cache-Control: no-store`
    pub no_store: bool,
    /// `no-cache` or `must-revalidate`: store, but treat as stale at once.
    pub revalidate_always: bool,
    /// Lifetime derived from `max-age` (minus `Age`) or `Expires`.
    pub ttl: Option<Duration>,
}

impl Freshness {
    /// Parse freshness from a response at time `now`.
    pub fn from_response(response: &HttpResponse, now: DateTime<Utc>) -> Self {
        let cache_control = response.header("cache-control").unwrap_or_default();
        let directives = Directives::parse(cache_control);

        let ttl = match directives.max_age {
            Some(max_age) => {
                let age = response
                    .header("age")
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .unwrap_or(0);
                Some(Duration::from_secs(max_age.saturating_sub(age)))
            }
            None => response
                .header("expires")
                .map(|value| ttl_from_expires(value, now)),
        };

        Self {
            no_store: directives.no_store,
            revalidate_always: directives.no_cache || directives.must_revalidate,
            ttl,
        }
    }

    /// Lifetime to apply when storing. Missing or overridden lifetimes are
    /// zero, keeping the entry only for revalidation and stale fallback.
    pub fn storable_ttl(&self) -> Duration {
        if self.revalidate_always {
            Duration::ZERO
        } else {
            self.ttl.unwrap_or(Duration::ZERO)
        }
    }
}

/// True when the caller asked to skip the freshness shortcut.
pub fn request_bypasses_fresh_entry(request: &HttpRequest) -> bool {
    let cache_control = request.header_value("cache-control").unwrap_or_default();
    let directives = Directives::parse(cache_control);
    directives.no_cache
        || directives.max_age == Some(0)
        || request
            .header_value("pragma")
            .is_some_and(|pragma| pragma.eq_ignore_ascii_case("no-cache"))
}

#[derive(Debug, Default)]
struct Directives {
    no_store: bool,
    no_cache: bool,
    must_revalidate: bool,
    max_age: Option<u64>,
}

impl Directives {
    fn parse(header: &str) -> Self {
        let mut directives = Self::default();
        for raw in header.split(',') {
            let token = raw.trim();
            let (name, value) = match token.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
                None => (token, None),
            };

            if name.eq_ignore_ascii_case("no-store") {
                directives.no_store = true;
            } else if name.eq_ignore_ascii_case("no-cache") {
                directives.no_cache = true;
            } else if name.eq_ignore_ascii_case("must-revalidate") {
                directives.must_revalidate = true;
            } else if name.eq_ignore_ascii_case("max-age") {
                directives.max_age = value.and_then(|v| v.parse::<u64>().ok());
            }
        }
        directives
    }
}

/// Invalid dates count as already expired.
fn ttl_from_expires(value: &str, now: DateTime<Utc>) -> Duration {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|expires| expires.with_timezone(&Utc) - now)
        .and_then(|delta| delta.to_std().ok())
        .unwrap_or(Duration::ZERO)
}

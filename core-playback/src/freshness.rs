//! Liveness probe for resolved stream URLs.
//!
//! CDN stream URLs expire server-side on their own schedule, so a URL that is
//! young enough is still checked with a cheap request before it is handed to
//! the player.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Checks whether a stream URL still answers.
#[async_trait]
pub trait StreamProbe: Send + Sync {
    /// `true` if `url` looks playable right now.
    async fn is_live(&self, url: &str) -> bool;
}

/// Probe over the platform [`HttpClient`]: `HEAD` first, then a one-byte
/// ranged `GET` for servers that refuse `HEAD`.
///
/// Each request is made once, bounded by `timeout`. Any failure, including a
/// timeout, counts as "not live".
pub struct HttpStreamProbe {
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl HttpStreamProbe {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }

    async fn attempt(&self, request: HttpRequest) -> bool {
        let request = request.timeout(self.timeout);
        let method = request.method;
        let probe = self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry());

        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(response)) => {
                let live = accepts(&response);
                debug!(%method, status = response.status, live, "Stream probe answered");
                live
            }
            Ok(Err(e)) => {
                debug!(%method, error = %e, "Stream probe failed");
                false
            }
            Err(_) => {
                debug!(%method, "Stream probe timed out");
                false
            }
        }
    }
}

fn accepts(response: &HttpResponse) -> bool {
    response.is_success() || response.status == 206
}

#[async_trait]
impl StreamProbe for HttpStreamProbe {
    async fn is_live(&self, url: &str) -> bool {
        if self.attempt(HttpRequest::head(url)).await {
            return true;
        }

        debug!(url = %redact_url(url), "HEAD rejected, trying ranged GET");
        self.attempt(HttpRequest::get(url).header("Range", "bytes=0-0"))
            .await
    }
}

/// Probe that always succeeds, for hosts that disable probing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysLive;

#[async_trait]
impl StreamProbe for AlwaysLive {
    async fn is_live(&self, _url: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result};
    use bridge_traits::http::HttpMethod;
    use parking_lot::Mutex;

    /// Answers HEAD and GET with fixed outcomes and records what was asked.
    struct Scripted {
        head: Option<u16>,
        get: Option<u16>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(head: Option<u16>, get: Option<u16>) -> Arc<Self> {
            Arc::new(Self {
                head,
                get,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for Scripted {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            let status = match request.method {
                HttpMethod::Head => self.head,
                _ => self.get,
            };
            self.requests.lock().push(request);
            match status {
                Some(status) => Ok(HttpResponse::new(status, "")),
                None => Err(BridgeError::Transport("connection reset".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_head_success_skips_get() {
        let http = Scripted::new(Some(200), Some(200));
        let probe = HttpStreamProbe::new(http.clone(), Duration::from_secs(5));

        assert!(probe.is_live("https://cdn/a").await);
        let requests = http.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_falls_back_to_ranged_get() {
        let http = Scripted::new(Some(405), Some(206));
        let probe = HttpStreamProbe::new(http.clone(), Duration::from_secs(5));

        assert!(probe.is_live("https://cdn/a").await);
        let requests = http.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, HttpMethod::Get);
        assert_eq!(requests[1].header_value("range"), Some("bytes=0-0"));
    }

    #[tokio::test]
    async fn test_dead_url() {
        let http = Scripted::new(None, Some(403));
        let probe = HttpStreamProbe::new(http, Duration::from_secs(5));
        assert!(!probe.is_live("https://cdn/a").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_server_times_out() {
        struct Hangs;

        #[async_trait]
        impl HttpClient for Hangs {
            async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
                std::future::pending().await
            }
        }

        let probe = HttpStreamProbe::new(Arc::new(Hangs), Duration::from_millis(50));
        assert!(!probe.is_live("https://cdn/a").await);
    }
}

//! `reqwest`-backed [`HttpClient`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout for catalog calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Desktop HTTP client.
///
/// [`execute`](HttpClient::execute) retries with [`RetryPolicy::default`].
/// Error statuses are returned as `Ok` once retries run out; only requests
/// that never got a response produce `Err`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

/// Outcome of one attempt.
enum Attempt {
    Done(reqwest::Response),
    RetryableStatus(reqwest::Response),
    Failed(BridgeError),
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default reqwest client");
            Self::with_client(Client::new())
        })
    }

    /// Client with an overall per-request `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("tunecore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(Self::with_client)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to build HTTP client: {e}")))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    fn prepare(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    fn map_error(error: &reqwest::Error) -> BridgeError {
        if error.is_timeout() {
            BridgeError::Timeout(error.to_string())
        } else if error.is_connect() || error.is_request() || error.is_body() {
            BridgeError::Transport(error.to_string())
        } else {
            BridgeError::OperationFailed(error.to_string())
        }
    }

    async fn attempt(&self, request: &HttpRequest) -> Attempt {
        match self.prepare(request).send().await {
            Ok(response) if RetryPolicy::retries_status(response.status().as_u16()) => {
                Attempt::RetryableStatus(response)
            }
            Ok(response) => Attempt::Done(response),
            Err(e) => Attempt::Failed(Self::map_error(&e)),
        }
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| Self::map_error(&e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            let last = attempt == attempts;
            debug!(attempt, attempts, method = %request.method, "Sending request");

            match self.attempt(&request).await {
                Attempt::Done(response) => return Self::read(response).await,
                Attempt::RetryableStatus(response) if last => {
                    warn!(status = response.status().as_u16(), "Retries exhausted");
                    return Self::read(response).await;
                }
                Attempt::Failed(e) if last => return Err(e),
                Attempt::RetryableStatus(response) => {
                    warn!(status = response.status().as_u16(), attempt, "Retryable status");
                }
                Attempt::Failed(e) => {
                    warn!(error = %e, attempt, "Request failed");
                }
            }

            tokio::time::sleep(policy.delay_after(attempt)).await;
        }

        Err(BridgeError::OperationFailed(
            "Retry loop ended without an attempt".to_string(),
        ))
    }
}

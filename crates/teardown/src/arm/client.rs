//! HTTP client for Azure Resource Manager
//!
//! Implements [`ResourceService::send`] over reqwest. Throttled and gateway
//! failures are retried with exponential backoff; every other status is
//! returned to the caller as data.

use super::error::{ProviderError, classify_response};
use super::request::{ArmRequest, ArmResponse, Method};
use super::service::ResourceService;
use super::token::{TokenProvider, TokenSource};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff applied to throttled requests
#[derive(Debug, Clone)]
pub struct ThrottleRetry {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_times: usize,
}

impl Default for ThrottleRetry {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            max_times: 5,
        }
    }
}

/// Resource Manager client bound to one endpoint and credential
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    token: TokenProvider,
    throttle: ThrottleRetry,
}

impl ArmClient {
    /// Create a client for `endpoint` (e.g. `https://management.azure.com`)
    pub fn new(endpoint: &str, source: TokenSource) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();

        Ok(Self {
            http,
            token: TokenProvider::new(source, format!("{}/", endpoint)),
            endpoint,
            throttle: ThrottleRetry::default(),
        })
    }

    /// Override the throttling backoff
    pub fn with_throttle_retry(mut self, throttle: ThrottleRetry) -> Self {
        self.throttle = throttle;
        self
    }

    async fn send_once(&self, request: &ArmRequest) -> Result<ArmResponse, ProviderError> {
        let url = format!("{}{}", self.endpoint, request.path);
        let token = self.token.token().await?;

        let mut builder = self
            .http
            .request(to_reqwest(request.method), &url)
            .bearer_auth(token)
            .query(&[("api-version", request.api_version.as_str())])
            .query(&request.query);

        builder = match &request.body {
            Some(body) => builder.json(body),
            None if request.method.is_mutation() => builder.header("Content-Length", "0"),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let operation = header(&response, "Azure-AsyncOperation")
            .or_else(|| header(&response, "Location"));
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!(
            method = %request.method,
            path = %request.path,
            status,
            "ARM request completed"
        );

        if status == 429 || (502..=504).contains(&status) {
            return Err(classify_response(status, &body, &request.path));
        }

        Ok(ArmResponse {
            status,
            body,
            operation,
        })
    }
}

#[async_trait]
impl ResourceService for ArmClient {
    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ProviderError> {
        let path = request.path.clone();

        (|| async { self.send_once(&request).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(self.throttle.min_delay)
                    .with_max_delay(self.throttle.max_delay)
                    .with_max_times(self.throttle.max_times),
            )
            .when(|e: &ProviderError| e.is_retryable())
            .notify(|e, dur| {
                warn!(
                    path = %path,
                    delay = ?dur,
                    error = %e,
                    "ARM request throttled, retrying..."
                );
            })
            .await
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

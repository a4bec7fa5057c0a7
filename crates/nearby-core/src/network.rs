//! Network fetch primitive.
//!
//! `Network::fetch` resolves to whatever the server answered, including
//! non-2xx statuses. Only transport failures (DNS, refused connection,
//! timeout) are errors. Timeouts belong to the primitive, not to callers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{OfflineError, OfflineResult};
use crate::http::{Request, Response};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> OfflineResult<Response>;
}

/// reqwest-backed network primitive.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new() -> OfflineResult<Self> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> OfflineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OfflineError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> OfflineResult<Response> {
        let url = request.url.as_str();
        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| OfflineError::network(url, e))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| OfflineError::network(url, e))?;

        debug!(method = %request.method, url = %url, status, bytes = body.len(), "Network response");

        Ok(Response {
            url: final_url,
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

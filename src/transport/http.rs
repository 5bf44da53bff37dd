use super::{RawResponse, Transport, TransportError};
use crate::client::types::{PreparedRequest, RequestBody};
use crate::config::ClientConfig;
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        // Env overrides the configured timeout so deployments can tune it without a rebuild.
        let timeout = env::var("SERVICE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.timeout());

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("SERVICE_REQUEST_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("SERVICE_REQUEST_PROXY_URL") {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(error = %e, "ignoring invalid SERVICE_REQUEST_PROXY_URL"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &PreparedRequest) -> std::result::Result<RawResponse, TransportError> {
        let descriptor = &request.descriptor;
        let mut req = self
            .client
            .request(descriptor.method.clone(), request.url.clone())
            .headers(descriptor.headers.clone());

        req = match &descriptor.body {
            RequestBody::Empty => req,
            RequestBody::Json(v) => req.json(v),
            RequestBody::Text(s) => req.body(s.clone()),
            RequestBody::Bytes(b) => req.body(b.clone()),
            RequestBody::Form(fields) => req.form(fields),
        };

        if let Some(timeout) = descriptor.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(classify_reqwest_error)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let url = resp.url().to_string();
        let body = resp.bytes().await.map_err(classify_reqwest_error)?;

        Ok(RawResponse {
            status,
            headers,
            url,
            body,
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::Request(e.to_string())
    } else {
        TransportError::Http(e)
    }
}

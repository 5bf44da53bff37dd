//! Client configuration
//!
//! Base configuration shared by every call made through one client: base URL, default
//! headers, timeout and retry knobs. Loadable from YAML or built in code.

use crate::error::ErrorContext;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Retry knobs for the default policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff step; 0 retries immediately.
    #[serde(default)]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_delay_ms() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            min_delay_ms: 0,
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default headers; per-request headers win on conflict.
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub enable_auto_retry: bool,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: default_headers(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            enable_auto_retry: true,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_auto_retry(mut self, enable: bool) -> Self {
        self.enable_auto_retry = enable;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| {
                Error::configuration_with_context(
                    "base_url is not an absolute URL",
                    ErrorContext::new()
                        .with_field_path("config.base_url")
                        .with_details(e.to_string())
                        .with_source("config_loader"),
                )
            })?;
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(Error::configuration_with_context(
                "retry.min_delay_ms exceeds retry.max_delay_ms",
                ErrorContext::new()
                    .with_field_path("config.retry")
                    .with_source("config_loader"),
            ));
        }
        self.header_map().map(|_| ())
    }

    /// Default headers as a case-insensitive map.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (k, v) in &self.headers {
            let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header name: {}", k),
                    ErrorContext::new()
                        .with_field_path(format!("config.headers.{}", k))
                        .with_details(e.to_string()),
                )
            })?;
            let value = HeaderValue::from_str(v).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header value for {}", k),
                    ErrorContext::new()
                        .with_field_path(format!("config.headers.{}", k))
                        .with_details(e.to_string()),
                )
            })?;
            map.insert(name, value);
        }
        if !map.contains_key(CONTENT_TYPE) {
            map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(map)
    }
}

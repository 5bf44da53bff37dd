//! 传输层抽象：协调器只依赖 [`Transport`]，具体实现为 reqwest。
//!
//! Transport abstraction. The request flow only depends on [`Transport`]; [`HttpTransport`]
//! is the reqwest-backed implementation.

pub mod http;

pub use http::HttpTransport;

use crate::client::types::PreparedRequest;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;

/// Raw bytes of a completed exchange, before body decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: String,
    pub body: Bytes,
}

/// Executes one attempt. Any HTTP status is a successful exchange at this layer.
///
/// Dropping the returned future must abort the underlying call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    /// The request could not be built; nothing was sent.
    #[error("Request construction failed: {0}")]
    Request(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(e) => e.is_timeout(),
            Self::Request(_) | Self::Other(_) => false,
        }
    }

    /// Builder or body-serialization failure. Replaying it cannot succeed.
    pub fn is_request_error(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Http(e) => e.is_builder(),
            Self::Timeout | Self::Other(_) => false,
        }
    }
}

//! 请求描述、响应信封与提取结果等核心数据类型。
//!
//! Request descriptors, response envelopes and the values a call settles with.

use crate::client::failure;
use crate::error::ApiError;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Opaque per-call identity shared by every retry of one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How deep into a structured body the settled value is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExtractLevel {
    /// 0: the full response envelope.
    Envelope,
    /// 1: the raw response body.
    #[default]
    Body,
    /// 2: the nested business payload (`body.data`).
    Payload,
}

impl TryFrom<u8> for ExtractLevel {
    type Error = String;

    fn try_from(level: u8) -> std::result::Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::Envelope),
            1 => Ok(Self::Body),
            2 => Ok(Self::Payload),
            other => Err(format!("extract level must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl From<ExtractLevel> for u8 {
    fn from(level: ExtractLevel) -> u8 {
        match level {
            ExtractLevel::Envelope => 0,
            ExtractLevel::Body => 1,
            ExtractLevel::Payload => 2,
        }
    }
}

/// Expected response representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Blob,
    ArrayBuffer,
    /// Buffered like binary; the body is not delivered incrementally.
    Stream,
}

impl ResponseType {
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Blob | Self::ArrayBuffer | Self::Stream)
    }
}

/// Outgoing request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
    Form(Vec<(String, String)>),
}

/// Everything a call site says about one request.
///
/// Frozen once dispatched; only the pre-request hook may still touch it (headers, auth).
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Absolute URL, or a path joined onto the client's base URL.
    pub url: String,
    /// Case-insensitive by construction.
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub query: Vec<(String, String)>,
    pub extract_level: ExtractLevel,
    pub response_type: ResponseType,
    /// Run the authorization step of the pre-request hook.
    pub authorization: bool,
    /// Surface terminal failures through the notifier. `false` silences them.
    pub silent_error_notify: bool,
    pub timeout: Option<Duration>,
    /// Caller-owned cancellation handle, chained into the per-call handle.
    pub signal: Option<CancellationToken>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            query: Vec::new(),
            extract_level: ExtractLevel::default(),
            response_type: ResponseType::default(),
            authorization: true,
            silent_error_notify: true,
            timeout: None,
            signal: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a header. Invalid names or values are skipped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.insert(n, v);
            }
            _ => tracing::warn!(header = name, "ignoring invalid request header"),
        }
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn extract_level(mut self, level: ExtractLevel) -> Self {
        self.extract_level = level;
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn authorization(mut self, enabled: bool) -> Self {
        self.authorization = enabled;
        self
    }

    pub fn silent_error_notify(mut self, notify: bool) -> Self {
        self.silent_error_notify = notify;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }

    /// Idempotent by HTTP convention: GET, HEAD, OPTIONS, PUT, DELETE.
    pub fn is_idempotent(&self) -> bool {
        is_idempotent_method(&self.method)
    }
}

pub fn is_idempotent_method(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::OPTIONS,
        Method::PUT,
        Method::DELETE,
    ]
    .contains(method)
}

/// A descriptor bound to its identity and resolved URL, as handed to the transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub id: RequestId,
    /// Base URL joined and query parameters applied.
    pub url: Url,
    pub descriptor: RequestDescriptor,
}

impl PreparedRequest {
    pub fn method(&self) -> &Method {
        &self.descriptor.method
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.descriptor.headers
    }
}

/// Decoded response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// A plain JSON object (not an array or scalar).
    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.as_json().and_then(|v| v.as_object())
    }

    /// JSON rendering for display and logging; binary bodies are summarized by length.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Json(v) => v.clone(),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Binary(b) => serde_json::json!({ "binary_len": b.len() }),
        }
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    /// Final URL after redirects.
    pub url: String,
    pub request: Arc<PreparedRequest>,
}

impl ResponseEnvelope {
    pub fn request_id(&self) -> &RequestId {
        &self.request.id
    }

    pub fn to_value(&self) -> serde_json::Value {
        let headers: serde_json::Map<String, serde_json::Value> = self
            .headers
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|s| (k.as_str().to_string(), serde_json::Value::String(s.to_string())))
            })
            .collect();
        serde_json::json!({
            "status": self.status,
            "url": self.url,
            "headers": headers,
            "data": self.body.to_value(),
        })
    }
}

/// The value a successful call settles with, selected by [`ExtractLevel`].
#[derive(Debug, Clone)]
pub enum Extracted {
    Envelope(Arc<ResponseEnvelope>),
    Body(ResponseBody),
    Payload(serde_json::Value),
}

impl Extracted {
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Envelope(env) => env.to_value(),
            Self::Body(body) => body.to_value(),
            Self::Payload(v) => v.clone(),
        }
    }

    pub fn as_envelope(&self) -> Option<&Arc<ResponseEnvelope>> {
        match self {
            Self::Envelope(env) => Some(env),
            _ => None,
        }
    }

    /// Deserialize the settled value into `T`.
    ///
    /// Envelopes deserialize from their body.
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, ApiError> {
        let value = match self {
            Self::Envelope(env) => env.body.to_value(),
            Self::Body(body) => body.to_value(),
            Self::Payload(v) => v.clone(),
        };
        serde_json::from_value(value).map_err(|e| failure::fault(e, None))
    }
}

/// Structured-result outcome: exactly one of `data` / `error` is set.
#[derive(Debug, Clone)]
pub struct FlatResponse {
    pub data: Option<Extracted>,
    pub error: Option<ApiError>,
    pub response: Option<Arc<ResponseEnvelope>>,
}

impl FlatResponse {
    pub(crate) fn from_result(
        result: std::result::Result<Extracted, ApiError>,
        response: Option<Arc<ResponseEnvelope>>,
    ) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
                response,
            },
            Err(error) => Self {
                response: response.or_else(|| error.response().cloned()),
                data: None,
                error: Some(error),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> std::result::Result<Option<Extracted>, ApiError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_level_serde() {
        let level: ExtractLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, ExtractLevel::Payload);
        assert!(serde_json::from_str::<ExtractLevel>("3").is_err());
        assert_eq!(serde_json::to_string(&ExtractLevel::Envelope).unwrap(), "0");
        assert_eq!(ExtractLevel::default(), ExtractLevel::Body);
    }

    #[test]
    fn test_descriptor_defaults() {
        let d = RequestDescriptor::get("/v2/system/info");
        assert!(d.authorization);
        assert!(d.silent_error_notify);
        assert_eq!(d.extract_level, ExtractLevel::Body);
        assert!(d.is_idempotent());
        assert!(!RequestDescriptor::post("/v2/login").is_idempotent());
    }

    #[test]
    fn test_headers_case_insensitive() {
        let d = RequestDescriptor::get("/x").header("X-Custom", "1");
        assert_eq!(d.headers.get("x-custom").unwrap(), "1");
    }

    #[test]
    fn test_request_id_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_json_mismatch_is_fault() {
        let value = Extracted::Payload(serde_json::json!({"id": "not a number"}));
        let err = value.json::<u32>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fault);
        assert_eq!(err.code().as_number(), Some(crate::error_code::FAULT_CODE));
        assert!(err.message().starts_with("fault: "));
        assert_eq!(value.json::<serde_json::Value>().unwrap()["id"], "not a number");
    }
}

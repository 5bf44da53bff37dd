//! 错误分类：库级错误与归一化的请求失败类型。
//!
//! Error types.
//!
//! Two layers live here:
//! - [`Error`]: library-level failures (configuration, transport construction, hook errors).
//! - [`ApiError`]: the normalized failure every request settles with. It is only ever
//!   built by the request flow's terminal-failure path (see `client::failure`).

use crate::client::types::ResponseEnvelope;
use crate::error_code::http_status_text;
use crate::utils::text::{request_path, sanitize_html};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Structured error context for configuration and hook failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "bearer_hooks")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Library error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Hook error: {message}{}", format_context(.context))]
    Hook {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn hook(msg: impl Into<String>) -> Self {
        Error::Hook {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn hook_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Hook {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Hook { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Normalized failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response reached the client.
    Network,
    /// The caller (or a chained external handle) aborted the request.
    Cancelled,
    /// An HTTP error status carrying a structured business body.
    BackendRejected,
    /// HTTP success whose body failed classification.
    Unrecognized,
    /// Everything else, including undecodable error bodies.
    Fault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cancelled => "cancelled",
            Self::BackendRejected => "backend_rejected",
            Self::Unrecognized => "unrecognized",
            Self::Fault => "fault",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business or transport code attached to an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl ErrorCode {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::Number(-1)
    }
}

impl From<i64> for ErrorCode {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

type BoxedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The normalized error every failed request settles with.
///
/// Cheap to clone: the originating response and wrapped error are shared.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    code: ErrorCode,
    message: String,
    response: Option<Arc<ResponseEnvelope>>,
    url: Option<String>,
    #[source]
    inner: Option<BoxedSource>,
}

impl ApiError {
    pub(crate) fn new(kind: ErrorKind, code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            response: None,
            url: None,
            inner: None,
        }
    }

    pub(crate) fn with_response(mut self, response: Arc<ResponseEnvelope>) -> Self {
        if self.url.is_none() {
            self.url = Some(response.url.clone());
        }
        self.response = Some(response);
        self
    }

    pub(crate) fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub(crate) fn with_inner<E>(mut self, inner: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner = Some(Arc::new(inner));
        self
    }

    /// Build a replacement error from application hooks.
    ///
    /// Keeps the response and URL of `origin` so reports still point at the failed call.
    pub fn replace(origin: &ApiError, code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            kind: origin.kind,
            code: code.into(),
            message: message.into(),
            response: origin.response.clone(),
            url: origin.url.clone(),
            inner: origin.inner.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn response(&self) -> Option<&Arc<ResponseEnvelope>> {
        self.response.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// HTTP status of the originating response, if one was received.
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// The wrapped lower-level error, untouched.
    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    pub fn is_unrecognized(&self) -> bool {
        self.kind == ErrorKind::Unrecognized
    }

    /// Render the sanitized report for display surfaces.
    pub fn report(&self) -> ErrorReport {
        let status = self.status().unwrap_or(0);
        ErrorReport {
            message: sanitize_html(&self.message),
            status,
            status_text: http_status_text(status),
            path: sanitize_html(&self.url.as_deref().map(request_path).unwrap_or_default()),
        }
    }

    /// Three-line report: message, status, settle path. Every free-text part is HTML-escaped.
    pub fn to_report_message(&self) -> String {
        self.report().to_string()
    }
}

/// Sanitized, display-ready view of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub status: u16,
    pub status_text: String,
    pub path: String,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\nat status ({} {})\nat settle ({})",
            self.message, self.status, self.status_text, self.path
        )
    }
}

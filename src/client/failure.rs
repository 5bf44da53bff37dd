//! 失败归一化：把取消、网络错误、错误状态与无法识别的响应统一为 `ApiError`。
//!
//! Terminal-failure normalization. Every [`ApiError`] a call settles with is built here.

use crate::client::policy::{AttemptFailure, FailureCause};
use crate::client::types::{ResponseBody, ResponseEnvelope};
use crate::error::{ApiError, ErrorCode, ErrorKind};
use crate::error_code::{
    bad_status_code, FAULT_CODE, NETWORK_ERROR_CODE, RESPONSE_UNRECOGNIZED, TIMEOUT_ERROR_CODE,
};
use crate::transport::TransportError;
use crate::utils::text::{truncate_string, MAX_RAW_MESSAGE_CHARS, OMIT_MARKER};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Wrapped as the inner error of status failures.
#[derive(Debug, Clone, Copy, Error)]
#[error("Request failed with status code {0}")]
pub struct HttpStatusError(pub u16);

/// Wrapped as the inner error of unrecognized responses.
#[derive(Debug, Clone, Copy, Error)]
#[error("unrecognized response")]
pub struct UnrecognizedResponse;

pub(crate) fn cancelled(reason: &str, url: Option<&str>) -> ApiError {
    let err = ApiError::new(
        ErrorKind::Cancelled,
        FAULT_CODE,
        format!("request canceled: {}", reason),
    );
    match url {
        Some(u) => err.with_url(u),
        None => err,
    }
}

pub(crate) fn from_attempt(failure: AttemptFailure, url: &str) -> ApiError {
    match failure.cause {
        FailureCause::Transport(e) if e.is_request_error() => fault(e, Some(url)),
        FailureCause::Transport(e) => network(e, url),
        FailureCause::Status(envelope) => from_status(envelope),
    }
}

pub(crate) fn network(err: TransportError, url: &str) -> ApiError {
    let code = if err.is_timeout() {
        TIMEOUT_ERROR_CODE
    } else {
        NETWORK_ERROR_CODE
    };
    ApiError::new(
        ErrorKind::Network,
        code,
        format!("unknown error: {}, {}", code, err),
    )
    .with_url(url)
    .with_inner(err)
}

/// Decode an HTTP error response.
///
/// - object body: `BackendRejected`, code from `code` then `errno`, message from `msg` then `message`
/// - binary body: decoded as text, then as JSON with the same rules
/// - other text: `Fault` carrying the truncated raw text
/// - empty or non-object JSON: `Fault` with a generic status message
pub(crate) fn from_status(envelope: Arc<ResponseEnvelope>) -> ApiError {
    let status = envelope.status;
    let err = match &envelope.body {
        ResponseBody::Json(Value::Object(obj)) => rejected(obj),
        ResponseBody::Binary(raw) => {
            let text = String::from_utf8_lossy(raw);
            match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(obj)) => rejected(&obj),
                Ok(_) => ApiError::new(ErrorKind::Fault, FAULT_CODE, "unknown"),
                Err(_) => raw_text(&text),
            }
        }
        ResponseBody::Text(text) if !text.trim().is_empty() => raw_text(text),
        _ => ApiError::new(
            ErrorKind::Fault,
            FAULT_CODE,
            format!(
                "unknown error: {}, {}",
                bad_status_code(status),
                HttpStatusError(status)
            ),
        ),
    };
    err.with_response(envelope).with_inner(HttpStatusError(status))
}

pub(crate) fn unrecognized(envelope: Arc<ResponseEnvelope>) -> ApiError {
    ApiError::new(
        ErrorKind::Unrecognized,
        RESPONSE_UNRECOGNIZED,
        "unrecognized response",
    )
    .with_response(envelope)
    .with_inner(UnrecognizedResponse)
}

/// Anything else that reaches the failure path, wrapped untouched.
pub(crate) fn fault<E>(err: E, url: Option<&str>) -> ApiError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let api = ApiError::new(ErrorKind::Fault, FAULT_CODE, format!("fault: {}", err)).with_inner(err);
    match url {
        Some(u) => api.with_url(u),
        None => api,
    }
}

fn rejected(obj: &Map<String, Value>) -> ApiError {
    let code = truthy_code(obj.get("code"))
        .or_else(|| truthy_code(obj.get("errno")))
        .unwrap_or_default();
    let message = truthy_str(obj.get("msg"))
        .or_else(|| truthy_str(obj.get("message")))
        .unwrap_or("unknown");
    ApiError::new(ErrorKind::BackendRejected, code, message)
}

fn raw_text(text: &str) -> ApiError {
    ApiError::new(
        ErrorKind::Fault,
        FAULT_CODE,
        truncate_string(text, MAX_RAW_MESSAGE_CHARS, OMIT_MARKER),
    )
}

// Zero and empty strings count as absent.
fn truthy_code(v: Option<&Value>) -> Option<ErrorCode> {
    match v? {
        Value::Number(n) => {
            let n = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            (n != 0).then_some(ErrorCode::Number(n))
        }
        Value::String(s) if !s.is_empty() => Some(ErrorCode::Text(s.clone())),
        _ => None,
    }
}

fn truthy_str(v: Option<&Value>) -> Option<&str> {
    v?.as_str().filter(|s| !s.is_empty())
}

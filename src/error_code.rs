//! 约定的常量：请求标识头、哨兵错误码、HTTP 状态文本表。
//!
//! Well-known codes and the fixed HTTP status text table used by error reports.
//!
//! ## Example
//!
//! ```rust
//! use service_request::error_code::{http_status_text, RESPONSE_UNRECOGNIZED};
//!
//! assert_eq!(http_status_text(404), "Not Found");
//! assert_eq!(http_status_text(418), "unknown-418");
//! assert_eq!(RESPONSE_UNRECOGNIZED, "BACKEND_UNRECOGNIZED");
//! ```

/// Header carrying the per-call request identity.
pub const REQUEST_ID_KEY: &str = "X-Request-Id";

/// Code of errors raised for HTTP-success responses that fail classification.
///
/// The default error hook absorbs errors with this code without notifying.
pub const RESPONSE_UNRECOGNIZED: &str = "BACKEND_UNRECOGNIZED";

/// Legacy backend error code.
#[deprecated(note = "backend failures are reported as ErrorKind::BackendRejected")]
pub const BACKEND_ERROR_CODE: &str = "BACKEND_ERROR";

/// Transport code for a request that never got a response.
pub const NETWORK_ERROR_CODE: &str = "ERR_NETWORK";

/// Transport code for an attempt that hit its timeout.
pub const TIMEOUT_ERROR_CODE: &str = "ECONNABORTED";

/// Code carried by every cancellation and unclassified fault.
pub const FAULT_CODE: i64 = -1;

/// Transport-style code for an HTTP error status without a decodable body.
pub fn bad_status_code(status: u16) -> &'static str {
    if (400..500).contains(&status) {
        "ERR_BAD_REQUEST"
    } else {
        "ERR_BAD_RESPONSE"
    }
}

/// HTTP status to display text. Unknown statuses render as `unknown-<code>`.
pub fn http_status_text(status: u16) -> String {
    let text = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return format!("unknown-{}", status),
    };
    text.to_string()
}

/// Transport-layer success: 2xx, or 304 Not Modified.
#[inline]
pub fn is_http_success(status: u16) -> bool {
    (200..300).contains(&status) || status == 304
}

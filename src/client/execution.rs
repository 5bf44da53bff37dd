//! 单次尝试：调用传输层并解码响应体。
//!
//! Single-attempt execution. Retry, cancellation and settling live in `core`.

use crate::client::core::Coordinator;
use crate::client::policy::{AttemptFailure, FailureCause};
use crate::client::types::{PreparedRequest, ResponseBody, ResponseEnvelope, ResponseType};
use crate::error_code::is_http_success;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

impl Coordinator {
    /// One transport round trip. Non-success statuses come back as a failure carrying the
    /// decoded envelope.
    pub(crate) async fn execute_once(
        &self,
        request: &Arc<PreparedRequest>,
    ) -> std::result::Result<Arc<ResponseEnvelope>, AttemptFailure> {
        let raw = match self.transport.execute(request).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(request_id = %request.id, error = %e, "attempt failed without response");
                return Err(AttemptFailure {
                    method: request.method().clone(),
                    cause: FailureCause::Transport(e),
                });
            }
        };

        let envelope = Arc::new(ResponseEnvelope {
            status: raw.status,
            body: decode_body(request.descriptor.response_type, raw.body),
            headers: raw.headers,
            url: raw.url,
            request: Arc::clone(request),
        });

        if is_http_success(envelope.status) {
            Ok(envelope)
        } else {
            debug!(request_id = %request.id, http_status = envelope.status, "attempt failed with status");
            Err(AttemptFailure {
                method: request.method().clone(),
                cause: FailureCause::Status(envelope),
            })
        }
    }
}

/// Decode by declared response type. JSON that fails to parse is kept as text.
pub(crate) fn decode_body(response_type: ResponseType, body: Bytes) -> ResponseBody {
    if response_type.is_binary() {
        return ResponseBody::Binary(body);
    }
    if body.is_empty() {
        return ResponseBody::Empty;
    }
    if response_type == ResponseType::Json {
        if let Ok(v) = serde_json::from_slice(&body) {
            return ResponseBody::Json(v);
        }
    }
    ResponseBody::Text(String::from_utf8_lossy(&body).into_owned())
}

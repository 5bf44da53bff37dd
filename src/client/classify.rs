//! 响应分类与提取：透传、结构化成功或无法识别。
//!
//! Response classification and extraction.
//!
//! Classification rules, in order:
//! 1. declared non-JSON response type (text, binary, stream): [`Classification::PassThrough`]
//! 2. status 204: [`Classification::PassThrough`]
//! 3. plain object body with a numeric `code >= 0`: [`Classification::StructuredSuccess`]
//! 4. anything else: [`Classification::Unrecognized`]

use crate::client::types::{ExtractLevel, Extracted, ResponseBody, ResponseEnvelope, ResponseType};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    PassThrough,
    StructuredSuccess,
    Unrecognized,
}

pub fn classify(envelope: &ResponseEnvelope) -> Classification {
    if envelope.request.descriptor.response_type != ResponseType::Json {
        return Classification::PassThrough;
    }
    if envelope.status == 204 {
        return Classification::PassThrough;
    }
    let code = envelope
        .body
        .as_object()
        .and_then(|obj| obj.get("code"))
        .and_then(|c| c.as_f64());
    match code {
        Some(c) if c >= 0.0 => Classification::StructuredSuccess,
        _ => Classification::Unrecognized,
    }
}

/// Select the settled value for `level`. Never fails; level 2 falls back to the envelope
/// when there is nothing to unwrap.
pub fn extract(envelope: Arc<ResponseEnvelope>, level: ExtractLevel) -> Extracted {
    match level {
        ExtractLevel::Envelope => Extracted::Envelope(envelope),
        ExtractLevel::Body => Extracted::Body(envelope.body.clone()),
        ExtractLevel::Payload => {
            if envelope.status == 204 {
                return Extracted::Envelope(envelope);
            }
            match &envelope.body {
                ResponseBody::Json(serde_json::Value::Object(obj)) => Extracted::Payload(
                    obj.get("data").cloned().unwrap_or(serde_json::Value::Null),
                ),
                _ => Extracted::Envelope(envelope),
            }
        }
    }
}

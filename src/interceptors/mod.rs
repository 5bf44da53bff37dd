//! Pluggable request hooks.
//!
//! One hook bundle per client:
//! - `on_request` runs once per logical call, before the first attempt, and may mutate headers
//! - `transform_response` selects the settled value for the call's extraction level
//! - `on_error` decides what happens to a terminal failure
//!
//! `is_backend_success` and `on_backend_fail` are legacy strategies kept for compatibility;
//! the request flow never consults them.

pub mod auth;

pub use auth::BearerTokenHooks;

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::classify::extract;
use crate::client::types::{ExtractLevel, Extracted, PreparedRequest, ResponseEnvelope};
use crate::error::ApiError;
use crate::Result;

/// What the error hook decided for a terminal failure.
#[derive(Debug, Clone)]
pub enum ErrorDisposition {
    /// Settle with the error and notify.
    Propagate,
    /// Settle with a replacement error and notify about it.
    Replace(ApiError),
    /// Settle successfully with a substitute value. No retry follows.
    Recover(Extracted),
    /// Settle with the error without notifying.
    Suppress,
}

#[async_trait]
pub trait RequestHooks: Send + Sync {
    async fn on_request(&self, _request: &mut PreparedRequest) -> Result<()> {
        Ok(())
    }

    /// Legacy. Always true.
    fn is_backend_success(&self, _response: &ResponseEnvelope) -> bool {
        true
    }

    /// Legacy. Never invoked.
    async fn on_backend_fail(&self, _response: &ResponseEnvelope) {}

    fn transform_response(&self, envelope: Arc<ResponseEnvelope>, level: ExtractLevel) -> Extracted {
        extract(envelope, level)
    }

    async fn on_error(&self, error: &ApiError) -> ErrorDisposition {
        default_disposition(error)
    }
}

/// Unrecognized-classification errors are absorbed; everything else propagates.
pub fn default_disposition(error: &ApiError) -> ErrorDisposition {
    if error.is_unrecognized() {
        ErrorDisposition::Suppress
    } else {
        ErrorDisposition::Propagate
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

#[async_trait]
impl RequestHooks for DefaultHooks {}

pub fn default_hooks() -> Arc<dyn RequestHooks> {
    Arc::new(DefaultHooks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::{RequestDescriptor, RequestId, ResponseBody};
    use crate::error::ErrorKind;
    use crate::error_code::RESPONSE_UNRECOGNIZED;
    use reqwest::header::HeaderMap;

    fn envelope() -> ResponseEnvelope {
        ResponseEnvelope {
            status: 200,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            url: "http://h/x".into(),
            request: Arc::new(PreparedRequest {
                id: RequestId::from("h"),
                url: url::Url::parse("http://h/x").unwrap(),
                descriptor: RequestDescriptor::get("/x"),
            }),
        }
    }

    #[tokio::test]
    async fn test_default_hooks() {
        let hooks = DefaultHooks;
        let unrecognized = ApiError::new(ErrorKind::Unrecognized, RESPONSE_UNRECOGNIZED, "x");
        assert!(matches!(
            hooks.on_error(&unrecognized).await,
            ErrorDisposition::Suppress
        ));
        let fault = ApiError::new(ErrorKind::Fault, -1, "x");
        assert!(matches!(hooks.on_error(&fault).await, ErrorDisposition::Propagate));
    }

    #[test]
    fn test_legacy_hooks_are_inert() {
        let hooks = DefaultHooks;
        let env = envelope();
        assert!(hooks.is_backend_success(&env));
        tokio_test::block_on(hooks.on_backend_fail(&env));
    }
}

//! Bearer authorization injected from a token accessor.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tracing::debug;

use super::{default_hooks, ErrorDisposition, RequestHooks};
use crate::client::types::{ExtractLevel, Extracted, PreparedRequest, ResponseEnvelope};
use crate::error::{ApiError, ErrorContext};
use crate::session::{TokenStore, ACCESS_TOKEN_KEY};
use crate::{Error, Result};

pub const DEFAULT_BEARER_FORMAT: &str = "Bearer {token}";

/// Sets `Authorization` on requests that ask for it, then delegates to `inner`.
pub struct BearerTokenHooks {
    tokens: Arc<dyn TokenStore>,
    format: String,
    inner: Arc<dyn RequestHooks>,
}

impl BearerTokenHooks {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens,
            format: DEFAULT_BEARER_FORMAT.to_string(),
            inner: default_hooks(),
        }
    }

    /// Header template; `{token}` is replaced with the access token, e.g. `Bearer TK="{token}"`.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_inner(mut self, inner: Arc<dyn RequestHooks>) -> Self {
        self.inner = inner;
        self
    }
}

#[async_trait]
impl RequestHooks for BearerTokenHooks {
    async fn on_request(&self, request: &mut PreparedRequest) -> Result<()> {
        if request.descriptor.authorization {
            if let Some(token) = self.tokens.get(ACCESS_TOKEN_KEY) {
                let value = HeaderValue::from_str(&self.format.replace("{token}", &token))
                    .map_err(|e| {
                        Error::hook_with_context(
                            "access token is not a valid header value",
                            ErrorContext::new()
                                .with_field_path("headers.Authorization")
                                .with_details(e.to_string())
                                .with_source("bearer_hooks"),
                        )
                    })?;
                request.headers_mut().insert(AUTHORIZATION, value);
                debug!(request_id = %request.id, "authorization attached");
            }
        }
        self.inner.on_request(request).await
    }

    fn transform_response(&self, envelope: Arc<ResponseEnvelope>, level: ExtractLevel) -> Extracted {
        self.inner.transform_response(envelope, level)
    }

    async fn on_error(&self, error: &ApiError) -> ErrorDisposition {
        self.inner.on_error(error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::{RequestDescriptor, RequestId};
    use crate::session::InMemoryTokenStore;

    fn prepared(descriptor: RequestDescriptor) -> PreparedRequest {
        PreparedRequest {
            id: RequestId::from("a"),
            url: url::Url::parse("http://h/x").unwrap(),
            descriptor,
        }
    }

    #[tokio::test]
    async fn test_injects_bearer_with_format() {
        let tokens = Arc::new(InMemoryTokenStore::new().with_token(ACCESS_TOKEN_KEY, "abc"));
        let hooks = BearerTokenHooks::new(tokens).with_format("Bearer TK=\"{token}\"");
        let mut req = prepared(RequestDescriptor::get("/x"));
        hooks.on_request(&mut req).await.unwrap();
        assert_eq!(
            req.descriptor.headers.get(AUTHORIZATION).unwrap(),
            "Bearer TK=\"abc\""
        );
    }

    #[tokio::test]
    async fn test_skips_when_disabled_or_missing() {
        let tokens = Arc::new(InMemoryTokenStore::new().with_token(ACCESS_TOKEN_KEY, "abc"));
        let hooks = BearerTokenHooks::new(tokens);
        let mut req = prepared(RequestDescriptor::get("/x").authorization(false));
        hooks.on_request(&mut req).await.unwrap();
        assert!(req.descriptor.headers.get(AUTHORIZATION).is_none());

        let hooks = BearerTokenHooks::new(Arc::new(InMemoryTokenStore::new()));
        let mut req = prepared(RequestDescriptor::get("/x"));
        hooks.on_request(&mut req).await.unwrap();
        assert!(req.descriptor.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_is_hook_error() {
        let tokens = Arc::new(InMemoryTokenStore::new().with_token(ACCESS_TOKEN_KEY, "a\nb"));
        let hooks = BearerTokenHooks::new(tokens);
        let mut req = prepared(RequestDescriptor::get("/x"));
        let err = hooks.on_request(&mut req).await.unwrap_err();
        assert!(matches!(err, Error::Hook { .. }));
    }
}

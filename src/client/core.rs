//! 请求生命周期协调器：标识、取消、重试、分类与终态失败处理。
//!
//! Request lifecycle coordinator.
//!
//! Per call: `Dispatched -> (Retrying)* -> Settled{Success | Cancelled | Failed}`.
//!
//! - identity and cancellation handle are assigned at dispatch, one per logical call
//! - the pre-request hook runs once, before the first attempt
//! - attempts of one call are strictly sequential; cancellation stops the in-flight attempt
//!   and any pending retry
//! - every terminal failure goes through one path: error hook, notification, 401 teardown
//! - the registry entry is released when the call settles or the pending call is dropped

use crate::client::cancel::{chain, CancellationRegistry, Registration};
use crate::client::classify::{classify, Classification};
use crate::client::failure;
use crate::client::policy::{RetryDecision, RetryPolicy};
use crate::client::state::StateBag;
use crate::client::types::{
    Extracted, FlatResponse, PreparedRequest, RequestDescriptor, RequestId, ResponseEnvelope,
};
use crate::error::{ApiError, ErrorContext};
use crate::error_code::REQUEST_ID_KEY;
use crate::interceptors::{ErrorDisposition, RequestHooks};
use crate::notify::{
    content_key, render_report, Localizer, NotificationStack, Notifier, NotifyOptions,
    REQUEST_FAILED_KEY,
};
use crate::session::SessionStore;
use crate::transport::Transport;
use crate::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Shared machinery behind both calling conventions.
pub struct Coordinator {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) hooks: Arc<dyn RequestHooks>,
    pub(crate) retry_policy: Arc<dyn RetryPolicy>,
    pub(crate) auto_retry: bool,
    pub(crate) base_url: Option<String>,
    pub(crate) default_headers: HeaderMap,
    pub(crate) registry: Arc<CancellationRegistry>,
    pub(crate) notifications: Arc<NotificationStack>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) localizer: Arc<dyn Localizer>,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) state: Arc<StateBag>,
}

struct Outcome {
    result: std::result::Result<Extracted, ApiError>,
    response: Option<Arc<ResponseEnvelope>>,
    attempts: u32,
}

impl Coordinator {
    /// Assign identity and cancellation handle. Nothing is sent until the returned
    /// [`PendingRequest`] is awaited.
    pub fn dispatch(self: &Arc<Self>, descriptor: RequestDescriptor) -> PendingRequest {
        let id = RequestId::generate();
        let token = chain(descriptor.signal.as_ref());
        let registration = Registration::new(Arc::clone(&self.registry), id.clone(), token);
        let notify = descriptor.silent_error_notify;
        debug!(
            request_id = %id,
            method = %descriptor.method,
            url = %descriptor.url,
            "request dispatched"
        );
        let prepared = self.prepare(id, descriptor);
        PendingRequest {
            coordinator: Arc::clone(self),
            registration,
            prepared,
            notify,
            started: Instant::now(),
        }
    }

    /// No-op for unknown or settled identities.
    pub fn cancel(&self, id: &RequestId) -> bool {
        self.registry.cancel(id)
    }

    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    pub fn notifications(&self) -> &Arc<NotificationStack> {
        &self.notifications
    }

    pub fn state(&self) -> &Arc<StateBag> {
        &self.state
    }

    fn prepare(
        &self,
        id: RequestId,
        mut descriptor: RequestDescriptor,
    ) -> std::result::Result<PreparedRequest, ApiError> {
        let url = self
            .resolve_url(&descriptor)
            .map_err(|e| failure::fault(e, Some(descriptor.url.as_str())))?;

        // call-site headers win over client defaults
        let mut headers = self.default_headers.clone();
        for (name, value) in descriptor.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(REQUEST_ID_KEY.as_bytes()),
            HeaderValue::from_str(id.as_str()),
        ) {
            headers.insert(name, value);
        }
        descriptor.headers = headers;

        Ok(PreparedRequest {
            id,
            url,
            descriptor,
        })
    }

    pub(crate) fn resolve_url(&self, descriptor: &RequestDescriptor) -> crate::Result<Url> {
        let mut url = match Url::parse(&descriptor.url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_deref().ok_or_else(|| {
                    Error::configuration_with_context(
                        "relative request URL without a base_url",
                        ErrorContext::new()
                            .with_field_path("config.base_url")
                            .with_details(descriptor.url.clone()),
                    )
                })?;
                Url::parse(&combine_urls(base, &descriptor.url))?
            }
            Err(e) => return Err(e.into()),
        };
        if !descriptor.query.is_empty() {
            url.query_pairs_mut().extend_pairs(descriptor.query.iter());
        }
        Ok(url)
    }

    async fn drive(
        &self,
        prepared: std::result::Result<PreparedRequest, ApiError>,
        notify: bool,
        token: &CancellationToken,
    ) -> Outcome {
        let mut request = match prepared {
            Ok(request) => request,
            Err(e) => return self.failed(e, notify, None, 0).await,
        };
        let url = request.url.to_string();

        let hooked = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return self
                    .failed(failure::cancelled("aborted before dispatch", Some(url.as_str())), notify, None, 0)
                    .await;
            }
            r = self.hooks.on_request(&mut request) => r,
        };
        if let Err(e) = hooked {
            return self
                .failed(failure::fault(e, Some(url.as_str())), notify, None, 0)
                .await;
        }

        let request = Arc::new(request);
        let mut attempt: u32 = 0;
        let settled = loop {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => break Err(failure::cancelled("aborted by caller", Some(url.as_str()))),
                r = self.execute_once(&request) => r,
            };
            let failed = match outcome {
                Ok(envelope) => break Ok(envelope),
                Err(failed) => failed,
            };
            let decision = if self.auto_retry {
                self.retry_policy.decide(&failed, attempt)
            } else {
                RetryDecision::Fail
            };
            match decision {
                RetryDecision::Retry { delay } => {
                    attempt += 1;
                    debug!(
                        request_id = %request.id,
                        attempt,
                        http_status = ?failed.status(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying request"
                    );
                    if !delay.is_zero() {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break Err(failure::cancelled("aborted during retry backoff", Some(url.as_str()))),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                RetryDecision::Fail => break Err(failure::from_attempt(failed, &url)),
            }
        };
        let attempts = attempt + 1;

        let envelope = match settled {
            Ok(envelope) => envelope,
            Err(e) => return self.failed(e, notify, None, attempts).await,
        };

        match classify(&envelope) {
            Classification::PassThrough | Classification::StructuredSuccess => {
                let level = request.descriptor.extract_level;
                Outcome {
                    result: Ok(self.hooks.transform_response(Arc::clone(&envelope), level)),
                    response: Some(envelope),
                    attempts,
                }
            }
            Classification::Unrecognized => {
                let err = failure::unrecognized(Arc::clone(&envelope));
                self.failed(err, notify, Some(envelope), attempts).await
            }
        }
    }

    async fn failed(
        &self,
        error: ApiError,
        notify: bool,
        response: Option<Arc<ResponseEnvelope>>,
        attempts: u32,
    ) -> Outcome {
        Outcome {
            result: self.settle_failure(error, notify).await,
            response,
            attempts,
        }
    }

    /// The single terminal-failure path.
    ///
    /// Cancellation settles directly. Everything else goes through the error hook, then
    /// notification unless suppressed or silenced; a 401 always tears the session down.
    async fn settle_failure(
        &self,
        error: ApiError,
        notify: bool,
    ) -> std::result::Result<Extracted, ApiError> {
        if error.is_cancelled() {
            return Err(error);
        }

        let status = error.status();
        let result = match self.hooks.on_error(&error).await {
            ErrorDisposition::Propagate => {
                if notify {
                    self.notify(&error);
                }
                Err(error)
            }
            ErrorDisposition::Replace(replacement) => {
                if notify {
                    self.notify(&replacement);
                }
                Err(replacement)
            }
            ErrorDisposition::Recover(value) => {
                debug!(kind = %error.kind(), "error hook recovered the call");
                Ok(value)
            }
            ErrorDisposition::Suppress => {
                debug!(kind = %error.kind(), code = %error.code(), "error suppressed by hook");
                Err(error)
            }
        };

        if status == Some(401) {
            warn!("unauthorized response, resetting session");
            self.session.reset_store().await;
        }
        result
    }

    fn notify(&self, error: &ApiError) {
        let content = render_report(&error.to_report_message());
        let key = content_key(&content);
        let title = self.localizer.t(REQUEST_FAILED_KEY, &[]);
        let notifier = Arc::clone(&self.notifier);
        let shown = self.notifications.show(key, move |dismissal| {
            notifier.error(
                &title,
                NotifyOptions::new()
                    .with_render(content)
                    .with_on_leave(move || dismissal.dismiss()),
            );
        });
        if !shown {
            debug!(code = %error.code(), "duplicate failure notification skipped");
        }
    }
}

/// `base` and `relative` joined with exactly one slash.
pub(crate) fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// A dispatched call. Awaiting [`send`](Self::send) or [`send_flat`](Self::send_flat) runs it;
/// dropping it unawaited releases its identity.
pub struct PendingRequest {
    coordinator: Arc<Coordinator>,
    registration: Registration,
    prepared: std::result::Result<PreparedRequest, ApiError>,
    notify: bool,
    started: Instant,
}

impl PendingRequest {
    pub fn id(&self) -> &RequestId {
        self.registration.id()
    }

    /// The call's internal handle. Cancelling it is equivalent to cancelling the identity.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.registration.token().clone()
    }

    /// Throwing convention: the extracted value or the normalized error.
    pub async fn send(self) -> std::result::Result<Extracted, ApiError> {
        self.run().await.result
    }

    /// Structured-result convention. Never fails.
    pub async fn send_flat(self) -> FlatResponse {
        let outcome = self.run().await;
        FlatResponse::from_result(outcome.result, outcome.response)
    }

    async fn run(self) -> Outcome {
        let PendingRequest {
            coordinator,
            registration,
            prepared,
            notify,
            started,
        } = self;

        let outcome = coordinator
            .drive(prepared, notify, registration.token())
            .await;
        let request_id = registration.id().clone();
        drop(registration);

        let duration_ms = started.elapsed().as_millis() as u64;
        let http_status = outcome
            .response
            .as_ref()
            .map(|r| r.status)
            .or_else(|| outcome.result.as_ref().err().and_then(|e| e.status()));
        match &outcome.result {
            Ok(_) => info!(
                request_id = %request_id,
                http_status = ?http_status,
                attempts = outcome.attempts,
                duration_ms,
                "request settled"
            ),
            Err(e) if e.is_cancelled() => info!(
                request_id = %request_id,
                attempts = outcome.attempts,
                duration_ms,
                "request cancelled"
            ),
            Err(e) => warn!(
                request_id = %request_id,
                http_status = ?http_status,
                attempts = outcome.attempts,
                duration_ms,
                kind = %e.kind(),
                code = %e.code(),
                error = %e,
                "request failed"
            ),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_urls() {
        assert_eq!(combine_urls("http://h/api/", "/v2/x"), "http://h/api/v2/x");
        assert_eq!(combine_urls("http://h/api", "v2/x"), "http://h/api/v2/x");
        assert_eq!(combine_urls("http://h/api", ""), "http://h/api");
    }
}

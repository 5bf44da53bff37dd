use crate::client::cancel::CancellationRegistry;
use crate::client::core::Coordinator;
use crate::client::instance::{FlatRequestClient, RequestClient};
use crate::client::policy::{IdempotentRetryPolicy, RetryPolicy};
use crate::client::state::StateBag;
use crate::config::ClientConfig;
use crate::interceptors::{default_hooks, RequestHooks};
use crate::notify::{noop_notifier, DefaultLocalizer, Localizer, NotificationStack, Notifier};
use crate::session::{NoopSession, SessionStore};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for both client flavours.
///
/// Everything is optional: the defaults are a reqwest transport built from the config, the
/// idempotent retry policy, no-op hooks, notifier and session, and English strings.
pub struct RequestClientBuilder {
    config: ClientConfig,
    hooks: Arc<dyn RequestHooks>,
    transport: Option<Arc<dyn Transport>>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    notifier: Arc<dyn Notifier>,
    localizer: Arc<dyn Localizer>,
    session: Arc<dyn SessionStore>,
    grace_window: Option<Duration>,
}

impl RequestClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            hooks: default_hooks(),
            transport: None,
            retry_policy: None,
            notifier: noop_notifier(),
            localizer: Arc::new(DefaultLocalizer::default()),
            session: Arc::new(NoopSession),
            grace_window: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RequestHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the reqwest transport (mock servers, scripted transports in tests).
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn with_session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = session;
        self
    }

    /// Delay after a dismissal before the dedup stack is force-cleared.
    pub fn notification_grace_window(mut self, grace: Duration) -> Self {
        self.grace_window = Some(grace);
        self
    }

    /// Throwing client.
    pub fn build(self) -> Result<RequestClient> {
        Ok(RequestClient::from_coordinator(self.coordinator()?))
    }

    /// Structured-result client.
    pub fn build_flat(self) -> Result<FlatRequestClient> {
        Ok(FlatRequestClient::from_coordinator(self.coordinator()?))
    }

    fn coordinator(self) -> Result<Arc<Coordinator>> {
        let mut config = self.config;
        // SERVICE_REQUEST_MAX_RETRIES overrides retry.max_retries.
        if let Some(n) = std::env::var("SERVICE_REQUEST_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.retry.max_retries = n;
        }
        config.validate()?;

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config)?),
        };
        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| Arc::new(IdempotentRetryPolicy::from_config(&config.retry)));
        let notifications = Arc::new(match self.grace_window {
            Some(grace) => NotificationStack::with_grace_window(grace),
            None => NotificationStack::new(),
        });

        Ok(Arc::new(Coordinator {
            transport,
            hooks: self.hooks,
            retry_policy,
            auto_retry: config.enable_auto_retry,
            default_headers: config.header_map()?,
            base_url: config.base_url.clone(),
            registry: Arc::new(CancellationRegistry::new()),
            notifications,
            notifier: self.notifier,
            localizer: self.localizer,
            session: self.session,
            state: Arc::new(StateBag::new()),
        }))
    }
}

impl Default for RequestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

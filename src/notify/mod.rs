//! 失败通知：去重栈、消息渲染面与本地化接口。
//!
//! Failure notification.
//!
//! The request flow never renders anything itself. It builds the report content, asks the
//! [`NotificationStack`] whether that content is already visible and, if not, hands it to a
//! [`Notifier`] together with an `on_leave` callback that dismisses the entry.

pub mod stack;

pub use stack::{Dismissal, NotificationStack, DEFAULT_GRACE_WINDOW};

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// Localization key for the notification title.
pub const REQUEST_FAILED_KEY: &str = "request.failed";

/// Options passed alongside a message.
#[derive(Default)]
pub struct NotifyOptions {
    /// Pre-rendered HTML body; every line is already escaped.
    pub render: Option<String>,
    /// Call (or drop) when the surface goes away.
    pub on_leave: Option<Box<dyn FnOnce() + Send>>,
}

impl fmt::Debug for NotifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyOptions")
            .field("render", &self.render)
            .field("on_leave", &self.on_leave.is_some())
            .finish()
    }
}

impl NotifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render(mut self, content: impl Into<String>) -> Self {
        self.render = Some(content.into());
        self
    }

    pub fn with_on_leave(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_leave = Some(Box::new(f));
        self
    }
}

/// Message rendering surface.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str, options: NotifyOptions);
}

/// Drops every notification; entries are dismissed immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn error(&self, _message: &str, _options: NotifyOptions) {}
}

pub fn noop_notifier() -> Arc<dyn Notifier> {
    Arc::new(NoopNotifier)
}

/// Logs notifications and keeps each one "visible" for a fixed display time.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    display: Duration,
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl TracingNotifier {
    pub fn new(display: Duration) -> Self {
        Self { display }
    }
}

impl Notifier for TracingNotifier {
    fn error(&self, message: &str, options: NotifyOptions) {
        warn!(
            title = message,
            content = options.render.as_deref().unwrap_or_default(),
            "request failure notification"
        );
        if let Some(on_leave) = options.on_leave {
            // Without a runtime the callback is dropped, which dismisses right away.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let display = self.display;
                handle.spawn(async move {
                    tokio::time::sleep(display).await;
                    on_leave();
                });
            }
        }
    }
}

/// A notification captured by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub message: String,
    pub content: Option<String>,
}

/// Records notifications and holds them visible until dismissed.
#[derive(Default)]
pub struct InMemoryNotifier {
    shown: Mutex<Vec<ShownNotification>>,
    visible: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<ShownNotification> {
        self.shown.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Close every visible surface.
    pub fn dismiss_all(&self) {
        let pending = std::mem::take(&mut *self.visible.lock().unwrap_or_else(|p| p.into_inner()));
        for on_leave in pending {
            on_leave();
        }
    }
}

impl Notifier for InMemoryNotifier {
    fn error(&self, message: &str, options: NotifyOptions) {
        self.shown
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(ShownNotification {
                message: message.to_string(),
                content: options.render,
            });
        if let Some(on_leave) = options.on_leave {
            self.visible
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(on_leave);
        }
    }
}

/// Translation function `t(key, params)`.
pub trait Localizer: Send + Sync {
    fn t(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// English strings; unknown keys render as the key itself. `{name}` placeholders are filled
/// from `params`.
#[derive(Debug, Clone)]
pub struct DefaultLocalizer {
    messages: HashMap<String, String>,
}

impl Default for DefaultLocalizer {
    fn default() -> Self {
        let messages = [
            (REQUEST_FAILED_KEY, "Request failed"),
            ("common.error", "Error"),
            ("common.confirm", "Confirm"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { messages }
    }
}

impl DefaultLocalizer {
    pub fn with_message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }
}

impl Localizer for DefaultLocalizer {
    fn t(&self, key: &str, params: &[(&str, &str)]) -> String {
        let mut text = self
            .messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string());
        for (name, value) in params {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}

/// One `<p>` per report line. Report lines are already escaped.
pub fn render_report(report: &str) -> String {
    report
        .lines()
        .map(|line| format!("<p>{}</p>", line))
        .collect()
}

/// Dedup key for rendered content.
pub fn content_key(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

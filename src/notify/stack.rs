//! 通知去重栈：同一消息在显示期间只出现一次。
//!
//! Notification dedup stack.
//!
//! Keys stay in the stack while their surface is visible. Dismissing a surface removes its
//! key and arms a full clear after the grace window; the clear is skipped if a new entry was
//! pushed in the meantime. The clear is applied lazily on the next access.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(5_000);

#[derive(Debug, Default)]
struct StackState {
    entries: Vec<String>,
    /// Bumped on every push.
    generation: u64,
    pending_clear: Option<(Instant, u64)>,
}

impl StackState {
    fn apply_pending_clear(&mut self) {
        if let Some((deadline, generation)) = self.pending_clear {
            if Instant::now() < deadline {
                return;
            }
            if generation == self.generation && !self.entries.is_empty() {
                debug!(stale = self.entries.len(), "notification stack force-cleared");
                self.entries.clear();
            }
            self.pending_clear = None;
        }
    }
}

#[derive(Debug)]
pub struct NotificationStack {
    state: Mutex<StackState>,
    grace: Duration,
}

impl Default for NotificationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStack {
    pub fn new() -> Self {
        Self::with_grace_window(DEFAULT_GRACE_WINDOW)
    }

    pub fn with_grace_window(grace: Duration) -> Self {
        Self {
            state: Mutex::new(StackState::default()),
            grace,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StackState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Push `key` and run `render` unless the key is already visible.
    ///
    /// `render` receives the [`Dismissal`] for the new entry; dropping it dismisses the entry.
    /// Returns whether `render` was invoked.
    pub fn show<F>(self: &Arc<Self>, key: impl Into<String>, render: F) -> bool
    where
        F: FnOnce(Dismissal),
    {
        let key = key.into();
        {
            let mut state = self.lock();
            state.apply_pending_clear();
            if state.entries.contains(&key) {
                return false;
            }
            state.entries.push(key.clone());
            state.generation += 1;
        }
        // Outside the lock: a renderer may dismiss synchronously.
        render(Dismissal {
            stack: Arc::clone(self),
            key: Some(key),
        });
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        let mut state = self.lock();
        state.apply_pending_clear();
        state.entries.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        let mut state = self.lock();
        state.apply_pending_clear();
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dismiss(&self, key: &str) {
        let mut state = self.lock();
        state.entries.retain(|k| k != key);
        let generation = state.generation;
        state.pending_clear = Some((Instant::now() + self.grace, generation));
    }
}

/// Removes one entry from its stack, at most once. Dropping it dismisses.
#[derive(Debug)]
pub struct Dismissal {
    stack: Arc<NotificationStack>,
    key: Option<String>,
}

impl Dismissal {
    pub fn dismiss(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(key) = self.key.take() {
            self.stack.dismiss(&key);
        }
    }
}

impl Drop for Dismissal {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_not_rendered() {
        let stack = Arc::new(NotificationStack::new());
        let mut held = Vec::new();
        assert!(stack.show("a", |d| held.push(d)));
        assert!(!stack.show("a", |d| held.push(d)));
        assert_eq!(held.len(), 1);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_drop_dismisses() {
        let stack = Arc::new(NotificationStack::new());
        assert!(stack.show("a", |_d| {}));
        assert!(!stack.contains("a"));
        assert!(stack.show("a", |_d| {}));
    }

    #[test]
    fn test_dismiss_is_once() {
        let stack = Arc::new(NotificationStack::new());
        let mut held = None;
        stack.show("a", |d| held = Some(d));
        stack.show("b", |d| std::mem::forget(d));
        if let Some(d) = held {
            d.dismiss();
        }
        assert!(!stack.contains("a"));
        assert!(stack.contains("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_window_clears_stale_entries() {
        let stack = Arc::new(NotificationStack::with_grace_window(Duration::from_millis(100)));
        let mut stale = None;
        stack.show("stale", |d| stale = Some(d));
        stack.show("gone", |_d| {});
        assert!(stack.contains("stale"));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(!stack.contains("stale"));
        // dismissing the already-cleared entry is harmless
        drop(stale);
        assert!(stack.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_entry_cancels_pending_clear() {
        let stack = Arc::new(NotificationStack::with_grace_window(Duration::from_millis(100)));
        let mut held = Vec::new();
        stack.show("a", |d| held.push(d));
        stack.show("b", |_d| {});
        stack.show("c", |d| held.push(d));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(stack.contains("a"));
        assert!(stack.contains("c"));
    }
}
